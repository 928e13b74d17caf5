use db::user::User;

#[derive(Debug)]
/// A permission for a given resource on the system.
pub enum Permission {
    /// Run bulk actions against stored records in the admin console.
    AdministerRecords,
    /// Edit the site-wide configuration.
    ModifyGlobalConfig,
}

/// Returns whether a requester has the requisite permission.
#[tracing::instrument]
pub fn has_permission(user: Option<&User>, permission: &Permission) -> bool {
    match permission {
        Permission::AdministerRecords | Permission::ModifyGlobalConfig => {
            user.map(|user| user.is_superuser).unwrap_or(false)
        }
    }
}
