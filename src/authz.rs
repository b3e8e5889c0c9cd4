//! Role-based access policy.
//!
//! Every handler asks [`authorize`] before touching the store. The decision depends only on
//! the caller's role set, the kind of resource and the operation, so the whole policy lives
//! in one table instead of being repeated per handler. Ownership ("only their own order")
//! is a separate instance-level check done by the services after lookup.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Staff group a user can belong to. Users in neither group are customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    DeliveryCrew,
}

impl Role {
    pub fn group_name(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::DeliveryCrew => "delivery_crew",
        }
    }

    pub fn from_group_name(name: &str) -> Option<Self> {
        match name {
            "manager" => Some(Role::Manager),
            "delivery_crew" => Some(Role::DeliveryCrew),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RoleSet {
    manager: bool,
    delivery_crew: bool,
}

impl RoleSet {
    pub fn customer() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role) -> Self {
        match role {
            Role::Manager => self.manager = true,
            Role::DeliveryCrew => self.delivery_crew = true,
        }
        self
    }

    pub fn contains(&self, role: Role) -> bool {
        match role {
            Role::Manager => self.manager,
            Role::DeliveryCrew => self.delivery_crew,
        }
    }

    pub fn is_customer(&self) -> bool {
        !self.manager && !self.delivery_crew
    }

    pub fn roles(&self) -> Vec<Role> {
        [Role::Manager, Role::DeliveryCrew]
            .into_iter()
            .filter(|role| self.contains(*role))
            .collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(RoleSet::customer(), RoleSet::with)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    MenuItem,
    Category,
    ManagerGroup,
    DeliveryCrewGroup,
    Cart,
    OrderCollection,
    Order,
    ManagerView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Read,
    Create,
    Update,
    Delete,
    /// Marking an order delivered.
    StatusPatch,
    /// Assigning or reassigning the delivery crew of an order.
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn require(self) -> AppResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(AppError::Forbidden),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Audience {
    Anyone,
    Manager,
    DeliveryCrew,
    Customer,
    Nobody,
}

fn audience(resource: Resource, op: Op) -> Audience {
    use Op::*;
    use Resource::*;

    match (resource, op) {
        (MenuItem | Category, Read) => Audience::Anyone,
        (MenuItem | Category, Create | Update | Delete) => Audience::Manager,

        (ManagerGroup | DeliveryCrewGroup, Read | Create | Delete) => Audience::Manager,

        (Cart, Read | Create | Update | Delete) => Audience::Customer,

        (OrderCollection, Create) => Audience::Customer,
        // listing is scoped per role by the order service
        (OrderCollection, Read) => Audience::Anyone,

        // reads are scoped per instance: own, assigned or all
        (Order, Read) => Audience::Anyone,
        (Order, Update) => Audience::Customer,
        (Order, Delete | Assign) => Audience::Manager,
        (Order, StatusPatch) => Audience::DeliveryCrew,

        (ManagerView, Read) => Audience::Manager,

        _ => Audience::Nobody,
    }
}

/// Decide whether an authenticated caller holding `roles` may perform `op` on `resource`.
pub fn authorize(roles: RoleSet, resource: Resource, op: Op) -> Decision {
    let allowed = match audience(resource, op) {
        Audience::Anyone => true,
        Audience::Manager => roles.contains(Role::Manager),
        Audience::DeliveryCrew => roles.contains(Role::DeliveryCrew),
        Audience::Customer => roles.is_customer(),
        Audience::Nobody => false,
    };
    if allowed { Decision::Allow } else { Decision::Deny }
}
