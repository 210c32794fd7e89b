// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Organization model: JobTread credentials plus dashboard preferences.

use super::ExtraFields;
use serde::{Deserialize, Serialize};

/// Default retainage withheld on AIA pay applications.
pub const DEFAULT_RETAINAGE_PERCENT: f64 = 10.0;

/// Organization document stored at `orgs/{orgId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Document ID (not stored in the document body)
    #[serde(alias = "_firestore_id", skip_serializing)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// JobTread API grant key
    #[serde(default)]
    pub grant_key: Option<String>,
    /// JobTread-side organization ID
    #[serde(rename = "orgID", default)]
    pub jobtread_org_id: Option<String>,

    // ─── Chart sources ───────────────────────────────────────────
    /// Job custom field used to attribute leads to a source
    #[serde(default)]
    pub lead_source_field: Option<String>,
    /// Job custom field naming the sales rep
    #[serde(default)]
    pub sales_rep_field: Option<String>,
    /// Monthly marketing spend, used for cost-per-lead
    #[serde(default)]
    pub marketing_budget: Option<f64>,

    // ─── Toolbox ─────────────────────────────────────────────────
    /// Location custom field receiving the Zestimate value
    #[serde(default)]
    pub zestimate_field: Option<String>,
    /// Location custom field receiving the Zestimate URL.
    ///
    /// Stored as `zillowUrlField` while manual requests call it
    /// `zestimateUrlField`; existing documents depend on this name.
    #[serde(rename = "zillowUrlField", default)]
    pub zestimate_url_field: Option<String>,
    #[serde(default)]
    pub cover_photo_enabled: bool,
    #[serde(default)]
    pub aia_retainage_percent: Option<f64>,

    /// Fields owned by the web app (billing, per-dashboard preferences).
    /// Carried through untouched so a settings save does not drop them.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Organization {
    /// Grant key, if present and non-blank.
    pub fn grant_key(&self) -> Option<&str> {
        non_blank(self.grant_key.as_deref())
    }

    /// JobTread organization ID, if present and non-blank.
    pub fn jobtread_org_id(&self) -> Option<&str> {
        non_blank(self.jobtread_org_id.as_deref())
    }

    pub fn retainage_percent(&self) -> f64 {
        self.aia_retainage_percent
            .filter(|p| (0.0..=100.0).contains(p))
            .unwrap_or(DEFAULT_RETAINAGE_PERCENT)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_preserved() {
        let org: Organization = serde_json::from_value(serde_json::json!({
            "grantKey": "gk",
            "orgID": "22Nabc",
            "zestimateField": "cf1",
            "zillowUrlField": "cf2",
            "marketingBudget": 2500.0
        }))
        .unwrap();

        assert_eq!(org.grant_key(), Some("gk"));
        assert_eq!(org.jobtread_org_id(), Some("22Nabc"));
        assert_eq!(org.zestimate_url_field.as_deref(), Some("cf2"));

        let back = serde_json::to_value(&org).unwrap();
        assert_eq!(back["zillowUrlField"], "cf2");
        assert_eq!(back["orgID"], "22Nabc");
        assert!(back.get("id").is_none());
    }

    #[test]
    fn unmodeled_fields_survive_round_trip() {
        let mut org: Organization = serde_json::from_value(serde_json::json!({
            "_firestore_id": "org1",
            "grantKey": "gk",
            "billingEmail": "ap@example.com",
            "chartPrefs": { "revenue": { "stacked": true } }
        }))
        .unwrap();
        assert_eq!(org.id.as_deref(), Some("org1"));
        assert!(!org.extra.contains_key("_firestore_id"));

        org.lead_source_field = Some("cf1".to_string());
        let back = serde_json::to_value(&org).unwrap();
        assert_eq!(back["billingEmail"], "ap@example.com");
        assert_eq!(back["chartPrefs"]["revenue"]["stacked"], true);
        assert_eq!(back["leadSourceField"], "cf1");
        assert!(back.get("_firestore_id").is_none());
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let org = Organization {
            grant_key: Some("   ".to_string()),
            jobtread_org_id: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(org.grant_key(), None);
        assert_eq!(org.jobtread_org_id(), None);
    }

    #[test]
    fn retainage_defaults_and_rejects_out_of_range() {
        let mut org = Organization::default();
        assert_eq!(org.retainage_percent(), DEFAULT_RETAINAGE_PERCENT);
        org.aia_retainage_percent = Some(5.0);
        assert_eq!(org.retainage_percent(), 5.0);
        org.aia_retainage_percent = Some(150.0);
        assert_eq!(org.retainage_percent(), DEFAULT_RETAINAGE_PERCENT);
    }
}
