use serde_json::{json, Map, Value};
use warp::{
    filters::BoxedFilter,
    reply::{self, Reply},
    Filter,
};

use super::filters::boxed_reply;
use crate::{
    config::Config,
    state::{with_state, AppState},
};

const SWAGGER_UI_VERSION: &str = "5.17.14";

pub fn routes(state: AppState) -> BoxedFilter<(Box<dyn Reply>,)> {
    let schema = warp::path!("api" / "schema")
        .and(warp::get())
        .and(with_state(state))
        .map(|state: AppState| reply::json(state.openapi.as_ref()));

    let docs = warp::path!("api" / "docs")
        .and(warp::get())
        .map(|| reply::html(swagger_page("/api/schema/")));

    schema.or(docs).map(boxed_reply).boxed()
}

fn swagger_page(schema_url: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Recipe API</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@{SWAGGER_UI_VERSION}/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@{SWAGGER_UI_VERSION}/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({{ url: "{schema_url}", dom_id: "#swagger-ui", persistAuthorization: true }});
  </script>
</body>
</html>
"##
    )
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn json_content(schema: Value) -> Value {
    json!({ "application/json": { "schema": schema } })
}

fn response(description: &str, schema: Option<Value>) -> Value {
    match schema {
        Some(schema) => json!({ "description": description, "content": json_content(schema) }),
        None => json!({ "description": description }),
    }
}

fn id_parameter(name: &str) -> Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "schema": { "type": "integer" }
    })
}

fn query_parameter(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "in": "query",
        "required": false,
        "description": description,
        "schema": { "type": "string" }
    })
}

/// One operation object. Every operation except user creation and token
/// issuing requires a token.
struct Operation {
    tag: &'static str,
    id: String,
    secured: bool,
    parameters: Vec<Value>,
    body: Option<Value>,
    responses: Vec<(&'static str, Value)>,
}

impl Operation {
    fn new(tag: &'static str, id: impl Into<String>) -> Self {
        Self {
            tag,
            id: id.into(),
            secured: true,
            parameters: vec![],
            body: None,
            responses: vec![],
        }
    }

    fn public(mut self) -> Self {
        self.secured = false;
        self
    }

    fn parameter(mut self, parameter: Value) -> Self {
        self.parameters.push(parameter);
        self
    }

    fn body(mut self, schema: Value) -> Self {
        self.body = Some(schema);
        self
    }

    fn respond(mut self, status: &'static str, response: Value) -> Self {
        self.responses.push((status, response));
        self
    }

    fn build(self) -> Value {
        let mut operation = Map::new();
        operation.insert("tags".into(), json!([self.tag]));
        operation.insert("operationId".into(), json!(self.id));
        if !self.parameters.is_empty() {
            operation.insert("parameters".into(), Value::Array(self.parameters));
        }
        if let Some(schema) = self.body {
            operation.insert(
                "requestBody".into(),
                json!({ "required": true, "content": json_content(schema) }),
            );
        }
        if self.secured {
            operation.insert("security".into(), json!([{ "tokenAuth": [] }]));
        }
        let responses: Map<String, Value> = self
            .responses
            .into_iter()
            .map(|(status, response)| (status.to_string(), response))
            .collect();
        operation.insert("responses".into(), Value::Object(responses));
        Value::Object(operation)
    }
}

fn attribute_paths(paths: &mut Map<String, Value>, plural: &str) {
    let list = || json!({ "type": "array", "items": schema_ref("Attribute") });

    paths.insert(
        format!("/api/recipe/{plural}/"),
        json!({
            "get": Operation::new("recipe", format!("recipe_{plural}_list"))
                .parameter(query_parameter("assigned_only", "Only return items assigned to a recipe (0 or 1)."))
                .respond("200", response("", Some(list())))
                .build(),
            "post": Operation::new("recipe", format!("recipe_{plural}_create"))
                .body(schema_ref("AttributeRequest"))
                .respond("201", response("", Some(schema_ref("Attribute"))))
                .build(),
        }),
    );

    let id = id_parameter("id");
    let member = |method: &str| {
        Operation::new("recipe", format!("recipe_{plural}_{method}")).parameter(id.clone())
    };
    paths.insert(
        format!("/api/recipe/{plural}/{{id}}/"),
        json!({
            "get": member("retrieve")
                .respond("200", response("", Some(schema_ref("Attribute"))))
                .build(),
            "put": member("update")
                .body(schema_ref("AttributeRequest"))
                .respond("200", response("", Some(schema_ref("Attribute"))))
                .build(),
            "patch": member("partial_update")
                .body(schema_ref("PatchedAttributeRequest"))
                .respond("200", response("", Some(schema_ref("Attribute"))))
                .build(),
            "delete": member("destroy")
                .respond("204", response("No response body", None))
                .build(),
        }),
    );
}

fn paths() -> Map<String, Value> {
    let mut paths = Map::new();

    paths.insert(
        "/api/user/create/".into(),
        json!({
            "post": Operation::new("user", "user_create_create")
                .public()
                .body(schema_ref("UserRequest"))
                .respond("201", response("", Some(schema_ref("User"))))
                .build(),
        }),
    );
    paths.insert(
        "/api/user/token/".into(),
        json!({
            "post": Operation::new("user", "user_token_create")
                .public()
                .body(schema_ref("AuthTokenRequest"))
                .respond("200", response("", Some(schema_ref("AuthToken"))))
                .build(),
        }),
    );
    paths.insert(
        "/api/user/me/".into(),
        json!({
            "get": Operation::new("user", "user_me_retrieve")
                .respond("200", response("", Some(schema_ref("User"))))
                .build(),
            "put": Operation::new("user", "user_me_update")
                .body(schema_ref("UserRequest"))
                .respond("200", response("", Some(schema_ref("User"))))
                .build(),
            "patch": Operation::new("user", "user_me_partial_update")
                .body(schema_ref("PatchedUserRequest"))
                .respond("200", response("", Some(schema_ref("User"))))
                .build(),
        }),
    );

    paths.insert(
        "/api/recipe/recipes/".into(),
        json!({
            "get": Operation::new("recipe", "recipe_recipes_list")
                .parameter(query_parameter("tags", "Comma separated list of tag IDs to filter"))
                .parameter(query_parameter("ingredients", "Comma separated list of ingredient IDs to filter"))
                .respond("200", response("", Some(json!({ "type": "array", "items": schema_ref("Recipe") }))))
                .build(),
            "post": Operation::new("recipe", "recipe_recipes_create")
                .body(schema_ref("RecipeDetailRequest"))
                .respond("201", response("", Some(schema_ref("RecipeDetail"))))
                .build(),
        }),
    );
    let recipe = |method: &str| {
        Operation::new("recipe", format!("recipe_recipes_{method}")).parameter(id_parameter("id"))
    };
    paths.insert(
        "/api/recipe/recipes/{id}/".into(),
        json!({
            "get": recipe("retrieve")
                .respond("200", response("", Some(schema_ref("RecipeDetail"))))
                .build(),
            "put": recipe("update")
                .body(schema_ref("RecipeDetailRequest"))
                .respond("200", response("", Some(schema_ref("RecipeDetail"))))
                .build(),
            "patch": recipe("partial_update")
                .body(schema_ref("PatchedRecipeDetailRequest"))
                .respond("200", response("", Some(schema_ref("RecipeDetail"))))
                .build(),
            "delete": recipe("destroy")
                .respond("204", response("No response body", None))
                .build(),
        }),
    );

    let mut upload = recipe("upload_image_create")
        .respond("200", response("", Some(schema_ref("RecipeImage"))))
        .build();
    upload["requestBody"] = json!({
        "required": true,
        "content": { "multipart/form-data": { "schema": schema_ref("RecipeImageRequest") } }
    });
    paths.insert(
        "/api/recipe/recipes/{id}/upload-image/".into(),
        json!({ "post": upload }),
    );

    attribute_paths(&mut paths, "tags");
    attribute_paths(&mut paths, "ingredients");

    paths.insert(
        "/api/recipe/favorites/".into(),
        json!({
            "get": Operation::new("recipe", "recipe_favorites_list")
                .respond("200", response("", Some(json!({ "type": "array", "items": schema_ref("Recipe") }))))
                .build(),
        }),
    );
    let favorite = |method: &str| {
        Operation::new("recipe", format!("recipe_favorites_{method}")).parameter(id_parameter("id"))
    };
    paths.insert(
        "/api/recipe/favorites/{id}/".into(),
        json!({
            "post": favorite("create")
                .respond("201", response("Recipe added to favorites.", Some(schema_ref("Message"))))
                .respond("200", response("Recipe already in favorites.", Some(schema_ref("Message"))))
                .build(),
            "delete": favorite("destroy")
                .respond("204", response("No response body", None))
                .build(),
        }),
    );

    paths
}

fn components() -> Value {
    let attribute = json!({
        "type": "object",
        "properties": {
            "id": { "type": "integer", "readOnly": true },
            "name": { "type": "string", "maxLength": 255 }
        },
        "required": ["id", "name"]
    });
    let attribute_request = json!({
        "type": "object",
        "properties": { "name": { "type": "string", "minLength": 1, "maxLength": 255 } },
        "required": ["name"]
    });
    let recipe_properties = json!({
        "id": { "type": "integer", "readOnly": true },
        "title": { "type": "string", "maxLength": 255 },
        "time_minutes": { "type": "integer" },
        "price": { "type": "string", "format": "decimal", "pattern": "^-?\\d{0,3}(?:\\.\\d{0,2})?$" },
        "link": { "type": "string", "maxLength": 255 },
        "tags": { "type": "array", "items": schema_ref("Attribute") },
        "ingredients": { "type": "array", "items": schema_ref("Attribute") }
    });
    let mut detail_properties = recipe_properties.clone();
    detail_properties["description"] = json!({ "type": "string" });
    detail_properties["image"] = json!({ "type": "string", "format": "uri", "readOnly": true, "nullable": true });

    let named = json!({ "type": "object", "properties": { "name": { "type": "string" } }, "required": ["name"] });
    let request_properties = json!({
        "title": { "type": "string", "minLength": 1, "maxLength": 255 },
        "time_minutes": { "type": "integer" },
        "price": { "type": "string", "format": "decimal" },
        "link": { "type": "string", "maxLength": 255 },
        "description": { "type": "string" },
        "tags": { "type": "array", "items": named },
        "ingredients": { "type": "array", "items": named }
    });
    let recipe_request = json!({
        "type": "object",
        "properties": request_properties.clone(),
        "required": ["title", "time_minutes", "price"]
    });

    let user_properties = json!({
        "email": { "type": "string", "format": "email", "maxLength": 255 },
        "password": { "type": "string", "writeOnly": true, "minLength": 5, "maxLength": 128 },
        "name": { "type": "string", "maxLength": 255 }
    });

    json!({
        "securitySchemes": {
            "tokenAuth": {
                "type": "apiKey",
                "in": "header",
                "name": "Authorization",
                "description": "Token-based authentication with required prefix \"Token\""
            }
        },
        "schemas": {
            "Attribute": attribute,
            "AttributeRequest": attribute_request,
            "PatchedAttributeRequest": {
                "type": "object",
                "properties": { "name": { "type": "string", "minLength": 1, "maxLength": 255 } }
            },
            "Recipe": {
                "type": "object",
                "properties": recipe_properties,
                "required": ["id", "title", "time_minutes", "price"]
            },
            "RecipeDetail": {
                "type": "object",
                "properties": detail_properties,
                "required": ["id", "title", "time_minutes", "price", "image"]
            },
            "RecipeDetailRequest": recipe_request,
            "PatchedRecipeDetailRequest": { "type": "object", "properties": request_properties },
            "RecipeImage": {
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "readOnly": true },
                    "image": { "type": "string", "format": "uri" }
                },
                "required": ["id"]
            },
            "RecipeImageRequest": {
                "type": "object",
                "properties": { "image": { "type": "string", "format": "binary" } },
                "required": ["image"]
            },
            "User": {
                "type": "object",
                "properties": {
                    "email": user_properties["email"],
                    "name": user_properties["name"]
                },
                "required": ["email", "name"]
            },
            "UserRequest": {
                "type": "object",
                "properties": user_properties,
                "required": ["email", "password", "name"]
            },
            "PatchedUserRequest": { "type": "object", "properties": user_properties },
            "AuthToken": {
                "type": "object",
                "properties": { "token": { "type": "string" } },
                "required": ["token"]
            },
            "AuthTokenRequest": {
                "type": "object",
                "properties": {
                    "email": { "type": "string", "format": "email" },
                    "password": { "type": "string", "writeOnly": true }
                },
                "required": ["email", "password"]
            },
            "Message": {
                "type": "object",
                "properties": { "detail": { "type": "string" } },
                "required": ["detail"]
            }
        }
    })
}

/// OpenAPI 3.0 description of every endpoint the service exposes.
pub fn openapi_document(config: &Config) -> Value {
    let mut paths = paths();
    paths.insert(
        format!("{}{{path}}", config.media_url),
        json!({
            "get": Operation::new("media", "media_retrieve")
                .public()
                .parameter(json!({ "name": "path", "in": "path", "required": true, "schema": { "type": "string" } }))
                .respond("200", json!({ "description": "Uploaded file" }))
                .respond("404", json!({ "description": "No such file" }))
                .build(),
        }),
    );

    let mut document = json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Recipe API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "REST API for managing recipes, tags and ingredients."
        },
        "paths": paths,
        "components": components()
    });
    if !config.public_url.is_empty() {
        document["servers"] = json!([{ "url": config.public_url }]);
    }

    document
}
