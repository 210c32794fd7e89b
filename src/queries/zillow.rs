// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Zestimate write-back mutation.

use super::fields;
use serde_json::{json, Map, Value};

/// Set the Zestimate value and URL custom fields on a location.
pub fn zestimate_update_mutation(
    location_id: &str,
    zestimate_field: &str,
    url_field: &str,
    zestimate: &Value,
    url: &str,
) -> Value {
    let mut values = Map::new();
    values.insert(zestimate_field.to_string(), zestimate.clone());
    values.insert(url_field.to_string(), Value::String(url.to_string()));

    json!({
        "updateLocation": {
            "$": {
                "id": location_id,
                "customFieldValues": values,
            },
            "location": fields(&["id", "formattedAddress"]),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_values_under_field_ids() {
        let q = zestimate_update_mutation(
            "loc1",
            "cfZ",
            "cfU",
            &json!(512300),
            "https://www.zillow.com/homedetails/1",
        );
        assert_eq!(
            q,
            json!({
                "updateLocation": {
                    "$": {
                        "id": "loc1",
                        "customFieldValues": {
                            "cfZ": 512300,
                            "cfU": "https://www.zillow.com/homedetails/1"
                        }
                    },
                    "location": {"id": {}, "formattedAddress": {}}
                }
            })
        );
    }
}
