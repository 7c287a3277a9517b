//! [`Role`] definitions.

use std::str::FromStr as _;

use common::define_kind;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

#[cfg(doc)]
use crate::domain::User;

define_kind! {
    #[doc = "Role of a [`User`] in the restaurant."]
    enum Role {
        #[doc = "Administrator, authorized for every route."]
        Admin = 1,

        #[doc = "Head chef, managing the dishes."]
        ChefCuisine = 2,

        #[doc = "Maître d'hôtel, managing the reservations."]
        MaitreHotel = 3,

        #[doc = "Dining room manager."]
        ResponsableSalle = 4,

        #[doc = "Editor of the website content."]
        GestionnaireContenu = 5,

        #[doc = "Person answering the contact messages."]
        ResponsableCommunication = 6,

        #[doc = "Person answering the customer reviews."]
        ResponsableAvis = 7,

        #[doc = "Regular employee without any privileges."]
        Employe = 8,
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Employe
    }
}

impl Role {
    /// Decides whether this [`Role`] is authorized for a route accepting the
    /// provided [`Role`]s.
    ///
    /// [`Role::Admin`] is always authorized, regardless of the `accepted` list.
    /// Other [`Role`]s are flat: no one implies another.
    #[must_use]
    pub fn is_authorized(self, accepted: &[Self]) -> bool {
        self == Self::Admin || accepted.contains(&self)
    }

    /// Resolves the [`Role`] a self-registering [`User`] receives.
    ///
    /// Registration never grants anything but the default [`Role`]: an absent,
    /// unrecognized or privileged request is silently downgraded. Elevation
    /// happens only through the administrators' user management.
    #[must_use]
    pub fn for_registration(requested: Option<&str>) -> Self {
        let default = Self::default();
        match requested.map(|r| Self::from_str(r.trim())) {
            None | Some(Ok(Self::Employe)) => default,
            Some(Ok(role)) => {
                tracing::warn!(
                    requested = %role,
                    granted = %default,
                    "privileged `Role` requested on registration, downgraded",
                );
                default
            }
            Some(Err(_)) => {
                tracing::warn!(
                    granted = %default,
                    "unrecognized `Role` requested on registration, \
                     downgraded",
                );
                default
            }
        }
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s)
            .map_err(|_| de::Error::custom(format!("unknown `Role`: `{s}`")))
    }
}
