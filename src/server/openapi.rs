//! OpenAPI description of the HTTP surface, served at `/api-docs`

use axum::Json;
use serde_json::{json, Value};

pub const DOCS_PATH: &str = "/api-docs";

pub async fn api_docs() -> Json<Value> {
    Json(document())
}

pub fn document() -> Value {
    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Hunter API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "REST API over hunters stored in a document collection with a relational mirror."
        },
        "paths": {
            "/hunters": {
                "get": list_operation(),
                "post": create_operation()
            },
            "/hunters/{nameFragment}": {
                "parameters": [fragment_parameter()],
                "get": find_operation(),
                "put": update_operation(),
                "delete": delete_operation()
            }
        },
        "components": { "schemas": schemas() }
    })
}

fn list_operation() -> Value {
    json!({
        "summary": "List every hunter in the document store",
        "responses": {
            "200": json_response("Hunters in insertion order", json!({ "type": "array", "items": schema_ref("StoredHunter") })),
            "500": error_response("Failed to fetch hunters")
        }
    })
}

fn create_operation() -> Value {
    json!({
        "summary": "Create a hunter",
        "requestBody": request_body("Hunter"),
        "responses": {
            "201": json_response("Hunter created", schema_ref("StoredHunter")),
            "400": error_response("Missing or invalid fields"),
            "500": error_response("Failed to create the hunter")
        }
    })
}

fn find_operation() -> Value {
    json!({
        "summary": "Find a hunter by name fragment",
        "responses": {
            "200": json_response("First matching hunter", schema_ref("StoredHunter")),
            "404": error_response("Hunter not found"),
            "500": error_response("Failed to search for the hunter")
        }
    })
}

fn update_operation() -> Value {
    json!({
        "summary": "Update the first hunter matching the name fragment",
        "requestBody": request_body("HunterPatch"),
        "responses": {
            "200": json_response("Hunter updated", schema_ref("StoredHunter")),
            "400": error_response("Invalid fields"),
            "404": error_response("Hunter not found"),
            "500": error_response("Failed to update the hunter")
        }
    })
}

fn delete_operation() -> Value {
    json!({
        "summary": "Delete the first hunter matching the name fragment",
        "responses": {
            "200": json_response("Hunter deleted", schema_ref("Message")),
            "404": error_response("Hunter not found"),
            "500": error_response("Failed to delete the hunter")
        }
    })
}

fn fragment_parameter() -> Value {
    json!({
        "in": "path",
        "name": "nameFragment",
        "required": true,
        "schema": { "type": "string" },
        "description": "Case-insensitive part of the hunter's name; the oldest match is used"
    })
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

fn request_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": { "application/json": { "schema": schema_ref(schema) } }
    })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn error_response(description: &str) -> Value {
    json_response(description, schema_ref("Error"))
}

fn schemas() -> Value {
    json!({
        "Hunter": {
            "type": "object",
            "required": ["name", "age", "height", "weight", "imageUrl"],
            "properties": hunter_properties()
        },
        "HunterPatch": {
            "type": "object",
            "properties": hunter_properties()
        },
        "StoredHunter": {
            "allOf": [
                schema_ref("Hunter"),
                { "type": "object", "properties": { "id": { "type": "string" } } }
            ]
        },
        "Message": {
            "type": "object",
            "properties": { "message": { "type": "string" } }
        },
        "Error": {
            "type": "object",
            "properties": { "error": { "type": "string" } }
        }
    })
}

fn hunter_properties() -> Value {
    json!({
        "name": { "type": "string" },
        "age": { "type": "integer" },
        "height": { "type": "number" },
        "weight": { "type": "number" },
        "imageUrl": { "type": "string" }
    })
}
