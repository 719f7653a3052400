use log::{debug, info, trace};
use ocs_status::{
    parse_document, translate, translate_http_status, translate_transport, Operation,
    TranslationContext,
};
use ocs_stream::{ClientConfig, Credentials, ExchangeExecutor, Method, RequestBody, TransferContext};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Header every OCS API call must carry.
pub const OCS_API_HEADER: &str = "OCS-APIREQUEST";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Deserialize)]
struct GroupList {
    #[serde(default)]
    groups: Vec<String>,
}

/// Blocking client for the user and group provisioning API.
///
/// Every call is sent as the administrator the client was built with.
/// Failure envelopes are translated per operation; see `ocs_status::translate`.
#[derive(Debug, Clone)]
pub struct ProvisioningClient {
    executor: ExchangeExecutor,
    config: ClientConfig,
    admin: Credentials,
}

impl ProvisioningClient {
    pub fn new(executor: ExchangeExecutor, config: ClientConfig, admin: Credentials) -> Self {
        Self {
            executor,
            config,
            admin,
        }
    }

    /// Build a client over the default transport, acting with the configured credentials.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let admin = config.credentials().ok_or_else(|| {
            ocs_status::Error::Config("provisioning needs [credentials] with a password".to_string())
        })?;
        let transport = ocs_stream::ReqwestTransport::new(&config.transport)
            .map_err(ocs_status::Error::from)?;
        let executor = ExchangeExecutor::new(std::sync::Arc::new(transport));
        Ok(Self::new(executor, config, admin))
    }

    /// Acting administrator.
    pub fn admin(&self) -> &str {
        self.admin.username()
    }

    pub fn create_group(&self, group: &str) -> Result<()> {
        check_id("group", group)?;
        let ctx = TranslationContext::new(self.admin(), group).with_entity(group);
        self.call::<IgnoredAny>(
            Method::Post,
            "/groups",
            Some(&[("groupid", group)]),
            Operation::CreateGroup,
            &ctx,
        )?;
        info!("created group '{}'", group);
        Ok(())
    }

    pub fn delete_group(&self, group: &str) -> Result<()> {
        let path = format!("/groups/{}", path_segment("group", group)?);
        let ctx = TranslationContext::new(self.admin(), group).with_entity(group);
        self.call::<IgnoredAny>(Method::Delete, &path, None, Operation::DeleteGroup, &ctx)?;
        info!("deleted group '{}'", group);
        Ok(())
    }

    pub fn add_user_to_group(&self, user: &str, group: &str) -> Result<()> {
        check_id("group", group)?;
        let path = format!("/users/{}/groups", path_segment("user", user)?);
        let ctx = TranslationContext::new(self.admin(), user).with_entity(group);
        self.call::<IgnoredAny>(
            Method::Post,
            &path,
            Some(&[("groupid", group)]),
            Operation::AddToGroup,
            &ctx,
        )?;
        info!("added '{}' to group '{}'", user, group);
        Ok(())
    }

    pub fn remove_user_from_group(&self, user: &str, group: &str) -> Result<()> {
        check_id("group", group)?;
        let path = format!("/users/{}/groups", path_segment("user", user)?);
        let ctx = TranslationContext::new(self.admin(), user).with_entity(group);
        self.call::<IgnoredAny>(
            Method::Delete,
            &path,
            Some(&[("groupid", group)]),
            Operation::RemoveFromGroup,
            &ctx,
        )?;
        info!("removed '{}' from group '{}'", user, group);
        Ok(())
    }

    pub fn create_user(&self, user: &str, password: &str) -> Result<()> {
        check_id("user", user)?;
        let ctx = TranslationContext::new(self.admin(), user);
        self.call::<IgnoredAny>(
            Method::Post,
            "/users",
            Some(&[("userid", user), ("password", password)]),
            Operation::CreateUser,
            &ctx,
        )?;
        info!("created user '{}'", user);
        Ok(())
    }

    pub fn delete_user(&self, user: &str) -> Result<()> {
        let path = format!("/users/{}", path_segment("user", user)?);
        let ctx = TranslationContext::new(self.admin(), user);
        self.call::<IgnoredAny>(Method::Delete, &path, None, Operation::DeleteUser, &ctx)?;
        info!("deleted user '{}'", user);
        Ok(())
    }

    /// Change one attribute (`email`, `quota`, `display`, `password`) of `user`.
    pub fn edit_user(&self, user: &str, key: &str, value: &str) -> Result<()> {
        let path = format!("/users/{}", path_segment("user", user)?);
        let ctx = TranslationContext::new(self.admin(), user);
        self.call::<IgnoredAny>(
            Method::Put,
            &path,
            Some(&[("key", key), ("value", value)]),
            Operation::EditUser,
            &ctx,
        )?;
        info!("changed {} of user '{}'", key, user);
        Ok(())
    }

    /// Groups `user` belongs to.
    pub fn user_groups(&self, user: &str) -> Result<Vec<String>> {
        let path = format!("/users/{}/groups", path_segment("user", user)?);
        let ctx = TranslationContext::new(self.admin(), user);
        let list = self.call::<GroupList>(Method::Get, &path, None, Operation::ListUserGroups, &ctx)?;
        Ok(list.map(|list| list.groups).unwrap_or_default())
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, &str)]>,
        operation: Operation,
        translation: &TranslationContext,
    ) -> Result<Option<T>> {
        let mut ctx = TransferContext::new(method, self.config.ocs_locator(path), self.admin.clone())
            .with_operation(operation)
            .with_header(OCS_API_HEADER, "true");
        let body = match form {
            Some(fields) => {
                ctx = ctx.with_content_type(FORM_CONTENT_TYPE);
                RequestBody::Bytes(serde_urlencoded::to_string(fields)?.into_bytes())
            }
            None => RequestBody::Empty,
        };
        trace!("{} on '{}' by '{}'", operation, translation.resource, translation.user);

        let (status, data) = self
            .executor
            .fetch(&ctx, body)
            .map_err(|err| translate_transport(err, operation, translation))?;

        match parse_document::<T>(&data) {
            Ok(document) => {
                debug!(
                    "{} answered {} (HTTP {})",
                    operation, document.ocs.meta.statuscode, status
                );
                translate(&document.ocs.meta, operation, translation)?;
                Ok(document.ocs.data)
            }
            Err(_) if !(200..300).contains(&status) => {
                let body = String::from_utf8_lossy(&data);
                Err(translate_http_status(status, &body, operation, translation).into())
            }
            Err(err) => Err(err.into()),
        }
    }
}

// ownCloud ids: letters, digits, space and `_.@-'`.
fn check_id(field: &'static str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value.trim() != value {
        Some("must not start or end with whitespace")
    } else if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || " _.@-'".contains(c))
    {
        Some("may only contain letters, digits, space and _.@-'")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(Error::Validation {
            field,
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn path_segment(field: &'static str, value: &str) -> Result<String> {
    check_id(field, value)?;
    Ok(urlencoding::encode(value).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_id() {
        assert!(check_id("user", "alice").is_ok());
        assert!(check_id("user", "alice.o'neil@example.com").is_ok());
        assert!(check_id("group", "sales team").is_ok());
        assert!(check_id("user", "").is_err());
        assert!(check_id("user", " alice").is_err());
        assert!(check_id("user", "../admin").is_err());
        assert!(check_id("group", "a?b").is_err());
    }

    #[test]
    fn test_path_segment_is_percent_encoded() {
        assert_eq!(path_segment("group", "sales team").unwrap(), "sales%20team");
        assert_eq!(
            path_segment("user", "o'neil@example.com").unwrap(),
            "o%27neil%40example.com"
        );
        assert!(matches!(
            path_segment("user", "a/b"),
            Err(Error::Validation { field: "user", .. })
        ));
    }
}
