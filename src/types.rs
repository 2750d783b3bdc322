use derive_more::{Display, Into};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Salesforce record identifier (15-char case-sensitive or 18-char
/// case-insensitive form).
///
/// Guaranteed valid by construction: holding a `RecordId` proves it is safe to
/// interpolate into a SOQL literal or a REST path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Into)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for RecordId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if matches!(s.len(), 15 | 18) && s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self(s))
        } else {
            Err(Error::InvalidRecordId(s))
        }
    }
}

/// API name of a Salesforce object (`Decision_Insight__c`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub struct SObjectName(&'static str);

impl SObjectName {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Custom object holding decision insights.
pub const DECISION_INSIGHT: SObjectName = SObjectName::new("Decision_Insight__c");

/// Custom object recording who viewed an insight and from where.
pub const DECISION_VIEW_EVENT: SObjectName = SObjectName::new("Decision_View_Event__c");
