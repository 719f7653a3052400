use ocs_status::{
    translate, translate_http_status, EntityKind, Error, Operation, StatusEnvelope, TranslationContext,
};

fn failure(code: u32, message: &str) -> StatusEnvelope {
    StatusEnvelope::new("failure", code, message)
}

fn membership_ctx() -> TranslationContext {
    TranslationContext::new("admin", "alice").with_entity("staff")
}

#[test]
fn common_codes_apply_to_every_operation() {
    let operations = [
        Operation::Generic,
        Operation::ReadFile,
        Operation::WriteFile,
        Operation::CreateGroup,
        Operation::DeleteGroup,
        Operation::AddToGroup,
        Operation::RemoveFromGroup,
        Operation::CreateUser,
        Operation::DeleteUser,
        Operation::EditUser,
        Operation::ListUserGroups,
    ];

    for operation in operations {
        let err = translate(&failure(997, "unauthorised"), operation, &membership_ctx()).unwrap_err();
        assert!(
            matches!(err, Error::Forbidden { ref user, ref resource } if user == "admin" && resource == "alice"),
            "{operation}: {err:?}"
        );

        let err = translate(&failure(998, "missing"), operation, &membership_ctx()).unwrap_err();
        match err {
            Error::NotFound { kind, message, .. } => {
                assert_eq!(kind, operation.subject());
                assert_eq!(message, "missing");
            }
            other => panic!("{operation}: unexpected {other:?}"),
        }
    }
}

#[test]
fn create_group_codes() {
    let ctx = TranslationContext::new("admin", "staff").with_entity("staff");

    let err = translate(&failure(101, "invalid input data"), Operation::CreateGroup, &ctx).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { ref name, ref message } if name == "staff" && message == "invalid input data"));

    let err = translate(&failure(102, ""), Operation::CreateGroup, &ctx).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { kind: EntityKind::Group, ref name } if name == "staff"));

    let err = translate(&failure(103, "failed to add"), Operation::CreateGroup, &ctx).unwrap_err();
    assert!(matches!(
        err,
        Error::OperationFailed { operation: Operation::CreateGroup, ref name, ref message }
            if name == "staff" && message == "failed to add"
    ));
}

#[test]
fn delete_group_codes() {
    let ctx = TranslationContext::new("admin", "staff").with_entity("staff");

    let err = translate(&failure(101, "does not exist"), Operation::DeleteGroup, &ctx).unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: EntityKind::Group, ref name, .. } if name == "staff"));

    let err = translate(&failure(102, ""), Operation::DeleteGroup, &ctx).unwrap_err();
    assert!(matches!(err, Error::OperationFailed { operation: Operation::DeleteGroup, .. }));
}

#[test]
fn group_membership_codes() {
    for operation in [Operation::AddToGroup, Operation::RemoveFromGroup] {
        let ctx = membership_ctx();

        let err = translate(&failure(101, "no group specified"), operation, &ctx).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { ref message, .. } if message == "no group specified"));

        let err = translate(&failure(102, ""), operation, &ctx).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: EntityKind::Group, ref name, .. } if name == "staff"));

        let err = translate(&failure(103, ""), operation, &ctx).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: EntityKind::User, ref name, .. } if name == "alice"));

        let err = translate(&failure(104, ""), operation, &ctx).unwrap_err();
        assert!(matches!(err, Error::Forbidden { ref user, .. } if user == "admin"));

        let err = translate(&failure(105, "backend refused"), operation, &ctx).unwrap_err();
        assert!(matches!(
            err,
            Error::OperationFailed { operation: op, ref name, ref message }
                if op == operation && name == "alice" && message == "backend refused"
        ));
    }
}

#[test]
fn user_codes() {
    let ctx = TranslationContext::new("admin", "alice");

    let err = translate(&failure(101, "bad password"), Operation::CreateUser, &ctx).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { ref name, .. } if name == "alice"));
    let err = translate(&failure(102, ""), Operation::CreateUser, &ctx).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { kind: EntityKind::User, ref name } if name == "alice"));
    let err = translate(&failure(103, ""), Operation::CreateUser, &ctx).unwrap_err();
    assert!(matches!(err, Error::OperationFailed { operation: Operation::CreateUser, .. }));

    let err = translate(&failure(101, ""), Operation::DeleteUser, &ctx).unwrap_err();
    assert!(matches!(err, Error::OperationFailed { operation: Operation::DeleteUser, .. }));

    let err = translate(&failure(101, ""), Operation::EditUser, &ctx).unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: EntityKind::User, .. }));
    let err = translate(&failure(102, "bad quota"), Operation::EditUser, &ctx).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { ref message, .. } if message == "bad quota"));
}

#[test]
fn unlisted_codes_are_unknown_backend_errors() {
    let _ = env_logger::builder().is_test(true).try_init();
    let ctx = membership_ctx();

    let cases = [
        (Operation::CreateGroup, 104),
        (Operation::DeleteGroup, 103),
        (Operation::AddToGroup, 106),
        (Operation::DeleteUser, 102),
        (Operation::Generic, 101),
        (Operation::ReadFile, 999),
    ];

    for (operation, code) in cases {
        let message = format!("raw message {code}");
        let err = translate(&failure(code, &message), operation, &ctx).unwrap_err();
        assert!(
            matches!(err, Error::UnknownBackend { code: c, message: ref m } if c == code && *m == message),
            "{operation} {code}: {err:?}"
        );
    }
}

#[test]
fn envelope_in_error_response_wins_over_http_status() {
    let ctx = TranslationContext::new("admin", "bob");
    let body = r#"{"ocs":{"meta":{"status":"failure","statuscode":998,"message":"user does not exist"},"data":[]}}"#;

    match translate_http_status(404, body, Operation::DeleteUser, &ctx) {
        Error::NotFound { kind, name, message } => {
            assert_eq!(kind, EntityKind::User);
            assert_eq!(name, "bob");
            assert_eq!(message, "user does not exist");
        }
        other => panic!("unexpected {:?}", other),
    }

    let group_ctx = TranslationContext::new("admin", "alice").with_entity("staff");
    let body = r#"{"ocs":{"meta":{"status":"failure","statuscode":102,"message":"group does not exist"},"data":[]}}"#;
    assert!(matches!(
        translate_http_status(400, body, Operation::AddToGroup, &group_ctx),
        Error::NotFound { kind: EntityKind::Group, ref name, .. } if name == "staff"
    ));

    // Without an envelope the raw status still decides.
    assert!(matches!(
        translate_http_status(404, "<html>gone</html>", Operation::DeleteUser, &ctx),
        Error::NotFound { kind: EntityKind::Resource, ref message, .. } if message == "HTTP 404"
    ));
}
