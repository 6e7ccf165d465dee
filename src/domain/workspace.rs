// Workspace domain models

pub const REQUIRED_SYSTEM_TABLES: [&str; 3] = [
    "system.access.audit",
    "system.compute.clusters",
    "system.billing.usage",
];

pub const REQUIRED_SYSTEM_SCHEMAS: [&str; 4] = ["billing", "compute", "access", "information_schema"];

/// Group every workspace user belongs to implicitly
pub const ACCOUNT_USERS_GROUP: &str = "account users";

/// Identity facts about the caller and the workspace they run against
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceContext {
    pub host: String,
    pub user_id: String,
    pub user_name: String,
    pub groups: Vec<String>,
    pub metastore_id: String,
}

impl WorkspaceContext {
    /// All principals whose grants apply to the caller: the user, their groups,
    /// then the implicit account-wide group.
    pub fn grantees(&self) -> Vec<String> {
        let mut grantees = Vec::with_capacity(self.groups.len() + 2);
        grantees.push(self.user_name.clone());
        for group in &self.groups {
            if !grantees.contains(group) {
                grantees.push(group.clone());
            }
        }
        if !grantees.iter().any(|g| g == ACCOUNT_USERS_GROUP) {
            grantees.push(ACCOUNT_USERS_GROUP.to_string());
        }
        grantees
    }

    pub fn home_folder(&self) -> String {
        format!("/Users/{}", self.user_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WarehouseSize {
    TwoXSmall,
    XSmall,
    Small,
    Medium,
    Large,
    XLarge,
    TwoXLarge,
    ThreeXLarge,
    FourXLarge,
    Other(String),
}

impl WarehouseSize {
    pub fn parse(label: &str) -> Self {
        match label {
            "2X-Small" => Self::TwoXSmall,
            "X-Small" => Self::XSmall,
            "Small" => Self::Small,
            "Medium" => Self::Medium,
            "Large" => Self::Large,
            "X-Large" => Self::XLarge,
            "2X-Large" => Self::TwoXLarge,
            "3X-Large" => Self::ThreeXLarge,
            "4X-Large" => Self::FourXLarge,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::TwoXSmall => "2X-Small",
            Self::XSmall => "X-Small",
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
            Self::XLarge => "X-Large",
            Self::TwoXLarge => "2X-Large",
            Self::ThreeXLarge => "3X-Large",
            Self::FourXLarge => "4X-Large",
            Self::Other(label) => label,
        }
    }

    /// Medium or larger can serve the dashboard queries
    pub fn is_dashboard_capable(&self) -> bool {
        matches!(
            self,
            Self::Medium
                | Self::Large
                | Self::XLarge
                | Self::TwoXLarge
                | Self::ThreeXLarge
                | Self::FourXLarge
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseDescriptor {
    pub id: String,
    pub name: String,
    pub size_class: WarehouseSize,
}

impl WarehouseDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, size_label: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size_class: WarehouseSize::parse(size_label),
        }
    }
}

/// A schema of the `system` catalog as reported by the metastore
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSchema {
    pub name: String,
    pub state: String,
}

impl SystemSchema {
    pub fn is_enabled(&self) -> bool {
        self.state == "ENABLE_COMPLETED"
    }
}
