use std::fmt;

use rolegate_core::{AppError, AppResult};
use rolegate_domain::ItemInput;

/// Who an operation is seeded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every registered user through the default role.
    DefaultUser,
    /// API administrators.
    Administrator,
}

macro_rules! api_operations {
    ($($variant:ident => ($audience:ident, $method:literal, $path:literal, $name:literal),)+) => {
        /// Protected operation declared by the access API.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ApiOperation {
            $(
                #[doc = $name]
                $variant,
            )+
        }

        impl ApiOperation {
            /// Every declared operation, in seeding order.
            pub const ALL: &'static [ApiOperation] = &[$(ApiOperation::$variant,)+];

            /// Returns the HTTP method.
            #[must_use]
            pub fn method(&self) -> &'static str {
                match self {
                    $(Self::$variant => $method,)+
                }
            }

            /// Returns the path pattern below the URI prefix; `*` marks the target id.
            #[must_use]
            pub fn relative_path(&self) -> &'static str {
                match self {
                    $(Self::$variant => $path,)+
                }
            }

            /// Returns the stable item name seeded for the operation.
            #[must_use]
            pub fn item_name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Returns the audience the operation is seeded for.
            #[must_use]
            pub fn audience(&self) -> Audience {
                match self {
                    $(Self::$variant => Audience::$audience,)+
                }
            }
        }
    };
}

api_operations! {
    ChangeOwnPassword => (DefaultUser, "POST", "/user/idpasswd/changepasswd", "change own password"),
    BindPhone => (DefaultUser, "POST", "/user/wx/bindphone", "bind phone number"),
    ReadSelf => (DefaultUser, "GET", "/user/me", "read own account"),
    Logout => (DefaultUser, "GET", "/user/logout", "log out"),
    LogoutPost => (DefaultUser, "POST", "/user/logout", "log out via post"),
    CreateItem => (Administrator, "POST", "/role/item", "create item"),
    UpdateItem => (Administrator, "PUT", "/role/item/*", "update item"),
    DeleteItem => (Administrator, "DELETE", "/role/item/*", "delete item"),
    GetItem => (Administrator, "GET", "/role/item/*", "read item"),
    SearchItems => (Administrator, "GET", "/role/items", "search items"),
    CreatePermission => (Administrator, "POST", "/role/permission", "create permission"),
    AddPermissionItems => (Administrator, "POST", "/role/permission/*/additems", "add items to permission"),
    RemovePermissionItems => (Administrator, "POST", "/role/permission/*/delitems", "remove items from permission"),
    UpdatePermission => (Administrator, "PUT", "/role/permission/*", "update permission"),
    DeletePermission => (Administrator, "DELETE", "/role/permission/*", "delete permission"),
    GetPermission => (Administrator, "GET", "/role/permission/*", "read permission"),
    SearchPermissions => (Administrator, "GET", "/role/permissions", "search permissions"),
    CreateRole => (Administrator, "POST", "/role/role", "create role"),
    AddRolePermissions => (Administrator, "POST", "/role/role/*/addps", "add permissions to role"),
    RemoveRolePermissions => (Administrator, "POST", "/role/role/*/delps", "remove permissions from role"),
    UpdateRole => (Administrator, "PUT", "/role/role/*", "update role"),
    DeleteRole => (Administrator, "DELETE", "/role/role/*", "delete role"),
    AddDelegatedRoles => (Administrator, "POST", "/role/role/*/addchildrole", "add delegated roles to role"),
    RemoveDelegatedRoles => (Administrator, "POST", "/role/role/*/delchildrole", "remove delegated roles from role"),
    GetRole => (Administrator, "GET", "/role/role/*", "read role"),
    SearchRoles => (Administrator, "GET", "/role/roles", "search roles"),
    CreatePasswordAccount => (Administrator, "POST", "/user/idpasswd", "create password account for user"),
    CreatePhoneAccount => (Administrator, "POST", "/user/phone", "create phone account for user"),
    BanUser => (Administrator, "POST", "/user/ban", "ban user"),
    UnbanUser => (Administrator, "POST", "/user/unban", "unban user"),
    ResetPassword => (Administrator, "POST", "/user/idpasswd/resetpasswd", "reset user password"),
    GetUser => (Administrator, "GET", "/user/user/*", "read user by id"),
    GetUserByOpenId => (Administrator, "GET", "/user/wx/openid/*", "read user by wechat openid"),
    GetUserByPhone => (Administrator, "GET", "/user/phone/*", "read user by phone"),
    SearchUsers => (Administrator, "GET", "/user/users", "search users"),
    GrantUserRoles => (Administrator, "POST", "/uwr/addroles", "grant roles to user"),
    RevokeUserRoles => (Administrator, "POST", "/uwr/delroles", "revoke roles from user"),
    GetUserRoles => (Administrator, "GET", "/uwr/user/*", "read user roles"),
    SearchUserRoles => (Administrator, "GET", "/uwr/users", "search users with roles"),
}

/// Concrete request path kept as segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    segments: Vec<String>,
}

impl RequestPath {
    /// Returns the path segments; the first is empty for absolute paths.
    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().map(String::as_str)
    }
}

impl fmt::Display for RequestPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.segments.join("/").as_str())
    }
}

/// Declared access API mounted below one URI prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSurface {
    uri_prefix: String,
}

impl ApiSurface {
    /// Creates a surface mounted at `uri_prefix`, such as `/api`.
    pub fn new(uri_prefix: &str) -> AppResult<Self> {
        let uri_prefix = uri_prefix.trim().trim_end_matches('/');
        if !uri_prefix.is_empty() && !uri_prefix.starts_with('/') {
            return Err(AppError::Validation(format!(
                "uri prefix '{uri_prefix}' must start with '/'"
            )));
        }

        Ok(Self {
            uri_prefix: uri_prefix.to_owned(),
        })
    }

    /// Returns the URI prefix without a trailing slash.
    #[must_use]
    pub fn uri_prefix(&self) -> &str {
        self.uri_prefix.as_str()
    }

    /// Returns the full path pattern of an operation.
    #[must_use]
    pub fn path_pattern(&self, operation: ApiOperation) -> String {
        format!("{}{}", self.uri_prefix, operation.relative_path())
    }

    /// Returns the concrete request path, substituting `target` for `*`.
    ///
    /// The target always fills exactly one segment, even when it contains `/`.
    pub fn request_path(
        &self,
        operation: ApiOperation,
        target: Option<&str>,
    ) -> AppResult<RequestPath> {
        if target.is_some_and(|target| target.trim().is_empty()) {
            return Err(AppError::Validation(format!(
                "target id of '{}' must not be blank",
                operation.item_name()
            )));
        }

        let mut target = target;
        let segments = self
            .path_pattern(operation)
            .split('/')
            .map(|segment| match (segment, target) {
                ("*", Some(value)) => {
                    target = None;
                    value.to_owned()
                }
                _ => segment.to_owned(),
            })
            .collect();

        Ok(RequestPath { segments })
    }

    /// Returns the system item declaration for an operation.
    #[must_use]
    pub fn item_input(&self, operation: ApiOperation) -> ItemInput {
        ItemInput {
            name: operation.item_name().to_owned(),
            method: operation.method().to_owned(),
            path: self.path_pattern(operation),
            ..ItemInput::default()
        }
    }

    /// Returns the operations seeded for one audience.
    pub fn operations(&self, audience: Audience) -> impl Iterator<Item = ApiOperation> + '_ {
        ApiOperation::ALL
            .iter()
            .copied()
            .filter(move |operation| operation.audience() == audience)
    }
}
