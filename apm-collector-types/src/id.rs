use std::fmt::Display;

/// A compact numeric surrogate key assigned by the identifier registry.
pub type SurrogateId = i32;

/// Sentinel meaning "not resolved". Registries never assign it.
pub const UNKNOWN_ID: SurrogateId = 0;

/// Separator of composite key parts.
pub const ID_SPLIT: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// The composite key of an identifier mapping.
pub enum IdKey {
    /// An application, by its code.
    Application { code: String },
    /// A remote peer, by its network address.
    NetworkAddress { address: String },
    /// An operation (service) name, scoped by its owning application.
    ServiceName {
        application_id: SurrogateId,
        name: String,
    },
    /// The application owning an application instance.
    InstanceApplication { instance_id: SurrogateId },
}

impl IdKey {
    pub fn network_address<S: Into<String>>(address: S) -> Self {
        Self::NetworkAddress {
            address: address.into(),
        }
    }

    pub fn service_name<S: Into<String>>(application_id: SurrogateId, name: S) -> Self {
        Self::ServiceName {
            application_id,
            name: name.into(),
        }
    }
}

impl Display for IdKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Application { code } => write!(f, "application{ID_SPLIT}{code}"),
            Self::NetworkAddress { address } => write!(f, "address{ID_SPLIT}{address}"),
            Self::ServiceName {
                application_id,
                name,
            } => write!(f, "{application_id}{ID_SPLIT}{name}"),
            Self::InstanceApplication { instance_id } => {
                write!(f, "instance{ID_SPLIT}{instance_id}")
            }
        }
    }
}
