use super::{Actor, Role};
use crate::error::AppError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    List,
    Show,
    Create,
    Update,
    Delete,
}

/// Who may perform an action.
#[derive(Clone, Copy, Debug)]
pub enum Access {
    Authenticated,
    Roles(&'static [Role]),
    /// The listed roles, or the actor acting on their own record.
    RolesOrSelf(&'static [Role]),
}

impl Access {
    pub fn permits(&self, actor: &Actor, target: Option<i64>) -> bool {
        match self {
            Access::Authenticated => true,
            Access::Roles(roles) => roles.contains(&actor.role),
            Access::RolesOrSelf(roles) => roles.contains(&actor.role) || target == Some(actor.id),
        }
    }
}

/// Access per CRUD action for one resource.
#[derive(Clone, Copy, Debug)]
pub struct AccessRules {
    pub list: Access,
    pub show: Access,
    pub create: Access,
    pub update: Access,
    pub delete: Access,
}

impl AccessRules {
    pub const OPEN: AccessRules = AccessRules {
        list: Access::Authenticated,
        show: Access::Authenticated,
        create: Access::Authenticated,
        update: Access::Authenticated,
        delete: Access::Authenticated,
    };

    /// Reads for everyone signed in, writes for `roles`.
    pub const fn writes_for(roles: &'static [Role]) -> AccessRules {
        AccessRules {
            create: Access::Roles(roles),
            update: Access::Roles(roles),
            delete: Access::Roles(roles),
            ..AccessRules::OPEN
        }
    }

    pub fn rule(&self, action: Action) -> Access {
        match action {
            Action::List => self.list,
            Action::Show => self.show,
            Action::Create => self.create,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }

    /// `target` is the id of the record acted on, when it names a user.
    pub fn check(&self, action: Action, actor: &Actor, target: Option<i64>) -> Result<(), AppError> {
        if self.rule(action).permits(actor, target) {
            return Ok(());
        }
        tracing::debug!(actor = actor.id, role = actor.role.id(), action = ?action, "access denied");
        Err(AppError::Forbidden("access denied".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: AccessRules = AccessRules {
        list: Access::Roles(&[Role::Admin]),
        show: Access::Authenticated,
        create: Access::Roles(&[Role::Admin]),
        update: Access::RolesOrSelf(&[Role::Admin]),
        delete: Access::Roles(&[Role::Admin]),
    };

    fn actor(id: i64, role: Role) -> Actor {
        Actor {
            id,
            role,
            client_id: None,
        }
    }

    #[test]
    fn non_admin_may_only_update_self() {
        let client = actor(5, Role::Client);
        assert!(USERS.check(Action::Update, &client, Some(5)).is_ok());
        assert!(matches!(
            USERS.check(Action::Update, &client, Some(6)),
            Err(AppError::Forbidden(_))
        ));
        assert!(USERS.check(Action::Update, &actor(1, Role::Admin), Some(6)).is_ok());
    }

    #[test]
    fn writes_for_keeps_reads_open() {
        const PRODUCTS: AccessRules = AccessRules::writes_for(&[Role::Admin, Role::Editor]);
        let client = actor(5, Role::Client);
        assert!(PRODUCTS.check(Action::List, &client, None).is_ok());
        assert!(PRODUCTS.check(Action::Create, &client, None).is_err());
        assert!(PRODUCTS.check(Action::Delete, &actor(2, Role::Editor), None).is_ok());
    }
}
