//! Schema assembler: compiled properties to a fixed-shape OpenAPI document.
//!
//! The document always has exactly two paths. `GET /metadata/schema` returns
//! the schema itself and `POST /run` accepts a request body referencing the
//! run-input component, which is closed with `additionalProperties: false`.
//!
//! Every part of the document is a typed serde struct so key order in the
//! rendered output is fixed by declaration order.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};

use crate::property::{PropertyMap, SchemaType};

/// OpenAPI version written into every document.
pub const OPENAPI_VERSION: &str = "3.1.0";

/// Path serving the schema document.
pub const SCHEMA_PATH: &str = "/metadata/schema";

/// Path accepting run input.
pub const RUN_PATH: &str = "/run";

/// Caller-supplied parts of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentOptions {
    pub title: String,
    pub version: String,
    /// Name of the run-input schema under `components.schemas`.
    pub component_name: String,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            title: "field-schema".to_string(),
            version: "1.0.0".to_string(),
            component_name: "RunInput".to_string(),
        }
    }
}

/// The assembled schema document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDocument {
    pub openapi: String,
    pub info: Info,
    pub paths: Paths,
    pub components: Components,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Info {
    pub title: String,
    pub version: String,
}

/// The two paths of the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paths {
    #[serde(rename = "/metadata/schema")]
    pub metadata_schema: PathItem,
    #[serde(rename = "/run")]
    pub run: PathItem,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: Responses,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: Content,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Responses {
    #[serde(rename = "200")]
    pub ok: Response,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub description: String,
    pub content: Content,
}

/// Content keyed by media type; only JSON is produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    #[serde(rename = "application/json")]
    pub json: MediaType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaType {
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Components {
    pub schemas: ComponentSchemas,
}

/// `components.schemas`, holding the single run-input component.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSchemas {
    pub name: String,
    pub schema: ComponentSchema,
}

impl Serialize for ComponentSchemas {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(std::iter::once((&self.name, &self.schema)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSchema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    pub additional_properties: bool,
    pub properties: PropertyMap,
}

/// Wraps compiled properties into the document.
///
/// # Examples
///
/// ```
/// use field_schema_core::*;
/// use serde_json::json;
///
/// let specs = parse_metadata(&json!({"toto": {"type": "int", "default": 1}})).unwrap();
/// let document = assemble(compile_properties(&specs).unwrap(), &DocumentOptions::default());
///
/// assert_eq!(document.path_names(), vec!["/metadata/schema", "/run"]);
/// assert!(!document.component().additional_properties);
///
/// let value = document.to_value();
/// assert_eq!(
///     value["paths"]["/run"]["post"]["requestBody"]["content"]["application/json"]["schema"],
///     json!({"$ref": "#/components/schemas/RunInput"})
/// );
/// assert_eq!(value["components"]["schemas"]["RunInput"]["properties"]["toto"]["default"], json!(1));
/// ```
pub fn assemble(properties: PropertyMap, options: &DocumentOptions) -> SchemaDocument {
    let component_ref = format!("#/components/schemas/{}", options.component_name);

    SchemaDocument {
        openapi: OPENAPI_VERSION.to_string(),
        info: Info {
            title: options.title.clone(),
            version: options.version.clone(),
        },
        paths: Paths {
            metadata_schema: PathItem {
                get: Some(Operation {
                    summary: "Return the schema document".to_string(),
                    request_body: None,
                    responses: object_response("Schema document"),
                }),
                post: None,
            },
            run: PathItem {
                get: None,
                post: Some(Operation {
                    summary: "Run with the given inputs".to_string(),
                    request_body: Some(RequestBody {
                        required: true,
                        content: Content {
                            json: MediaType {
                                schema: json!({ "$ref": component_ref }),
                            },
                        },
                    }),
                    responses: object_response("Run result"),
                }),
            },
        },
        components: Components {
            schemas: ComponentSchemas {
                name: options.component_name.clone(),
                schema: ComponentSchema {
                    schema_type: SchemaType::Object,
                    additional_properties: false,
                    properties,
                },
            },
        },
    }
}

fn object_response(description: &str) -> Responses {
    Responses {
        ok: Response {
            description: description.to_string(),
            content: Content {
                json: MediaType {
                    schema: json!({ "type": "object" }),
                },
            },
        },
    }
}

impl SchemaDocument {
    /// The run-input component.
    pub fn component(&self) -> &ComponentSchema {
        &self.components.schemas.schema
    }

    pub fn component_name(&self) -> &str {
        &self.components.schemas.name
    }

    /// Path keys in document order.
    pub fn path_names(&self) -> Vec<&'static str> {
        vec![SCHEMA_PATH, RUN_PATH]
    }

    /// Converts the document to a JSON value tree.
    pub fn to_value(&self) -> Value {
        // Every field is a plain string, bool or JSON value, so this cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
