//! FES 2.0 sorting clause (`SORTBY` / `fes:SortBy`).

use serde::{Deserialize, Serialize};

use ows_common::Exception;

use crate::xml::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Case-insensitive; FES 1.1 spellings `A`/`D` are accepted too.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "ASC" | "A" => Some(SortOrder::Asc),
            "DESC" | "D" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortProperty {
    pub value_reference: String,
    pub order: Option<SortOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub properties: Vec<SortProperty>,
}

impl SortBy {
    /// Parse `name [ASC|DESC][,name [ASC|DESC]]*`.
    pub fn from_kvp(value: &str) -> Result<SortBy, Exception> {
        let invalid = || Exception::invalid_parameter_value(&["SORTBY", value]);
        let mut properties = Vec::new();

        for item in value.split(',') {
            let mut tokens = item.split_whitespace();
            let value_reference = tokens.next().ok_or_else(invalid)?;
            let order = match tokens.next() {
                Some(order) => Some(SortOrder::parse(order).ok_or_else(invalid)?),
                None => None,
            };
            if tokens.next().is_some() {
                return Err(invalid());
            }
            properties.push(SortProperty {
                value_reference: value_reference.to_string(),
                order,
            });
        }

        Ok(SortBy { properties })
    }

    pub fn to_kvp(&self) -> String {
        self.properties
            .iter()
            .map(|property| match property.order {
                Some(order) => format!("{} {}", property.value_reference, order.as_str()),
                None => property.value_reference.clone(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn from_element(element: &Element) -> Result<SortBy, Exception> {
        let mut properties = Vec::new();
        for property in element.children_named("SortProperty") {
            let value_reference = property
                .child_text("ValueReference")
                .map(|path| path.trim().to_string())
                .ok_or_else(|| {
                    Exception::operation_parsing_failed(&["SortBy", "SortProperty without ValueReference"])
                })?;
            let order = match property.child_text("SortOrder") {
                Some(order) => Some(SortOrder::parse(&order).ok_or_else(|| {
                    let detail = format!("invalid SortOrder {}", order);
                    Exception::operation_parsing_failed(&["SortBy", detail.as_str()])
                })?),
                None => None,
            };
            properties.push(SortProperty {
                value_reference,
                order,
            });
        }
        Ok(SortBy { properties })
    }

    pub fn to_element(&self) -> Element {
        let mut element = Element::new("fes:SortBy");
        for property in &self.properties {
            let mut sort_property = Element::new("fes:SortProperty");
            sort_property.push(Element::with_text(
                "fes:ValueReference",
                property.value_reference.clone(),
            ));
            if let Some(order) = property.order {
                sort_property.push(Element::with_text("fes:SortOrder", order.as_str()));
            }
            element.push(sort_property);
        }
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ows_common::ExceptionCode;

    #[test]
    fn test_sort_by_from_kvp() {
        let sort_by = SortBy::from_kvp("kad:perceelnummer DESC,kad:gemeente").unwrap();
        assert_eq!(
            sort_by.properties,
            vec![
                SortProperty {
                    value_reference: "kad:perceelnummer".to_string(),
                    order: Some(SortOrder::Desc),
                },
                SortProperty {
                    value_reference: "kad:gemeente".to_string(),
                    order: None,
                },
            ]
        );
        assert_eq!(sort_by.to_kvp(), "kad:perceelnummer DESC,kad:gemeente");
    }

    #[test]
    fn test_sort_order_is_case_insensitive() {
        let sort_by = SortBy::from_kvp("name asc").unwrap();
        assert_eq!(sort_by.properties[0].order, Some(SortOrder::Asc));
    }

    #[test]
    fn test_sort_by_rejects_bad_order() {
        let err = SortBy::from_kvp("name UP").unwrap_err();
        assert_eq!(err.code, ExceptionCode::InvalidParameterValue);
        assert_eq!(err.locator.as_deref(), Some("SORTBY"));

        assert!(SortBy::from_kvp("a,,b").is_err());
        assert!(SortBy::from_kvp("a ASC extra").is_err());
    }

    #[test]
    fn test_sort_by_xml() {
        let element = Element::parse(
            br#"<SortBy><SortProperty><ValueReference>a</ValueReference><SortOrder>DESC</SortOrder></SortProperty></SortBy>"#,
        )
        .unwrap();
        let sort_by = SortBy::from_element(&element).unwrap();
        assert_eq!(sort_by.to_kvp(), "a DESC");
        assert_eq!(SortBy::from_element(&sort_by.to_element()).unwrap(), sort_by);
    }
}
