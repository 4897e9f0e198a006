use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Page size the real platform uses when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 200;

#[derive(Clone, Debug)]
pub enum Item {
    /// A record table (`Results` or `Issues`).
    Table {
        reference_type: String,
        /// (ColumnName, LabelText)
        columns: Vec<(String, String)>,
        editor_columns: Vec<String>,
    },
    /// A directory site grouping other sites.
    Folder { title: String },
    Record { site_id: String, fields: Map<String, Value> },
}

/// Every request the server accepted, in arrival order.
#[derive(Clone, Debug)]
pub struct Received {
    pub id: String,
    pub action: String,
    pub body: Value,
}

#[derive(Debug)]
pub struct Platform {
    pub api_key: String,
    pub page_size: usize,
    /// Answer 500 to a paginated `/get` carrying this offset.
    pub fail_at_offset: Option<u64>,
    pub items: BTreeMap<String, Item>,
    pub received: Vec<Received>,
    next_id: u64,
}

impl Platform {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            fail_at_offset: None,
            items: BTreeMap::new(),
            received: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add_table(&mut self, reference_type: &str, columns: &[(&str, &str)], editor_columns: &[&str]) -> String {
        let id = self.allocate_id();
        self.items.insert(
            id.clone(),
            Item::Table {
                reference_type: reference_type.to_string(),
                columns: columns
                    .iter()
                    .map(|(name, label)| (name.to_string(), label.to_string()))
                    .collect(),
                editor_columns: editor_columns.iter().map(|c| c.to_string()).collect(),
            },
        );
        id
    }

    pub fn add_folder(&mut self, title: &str) -> String {
        let id = self.allocate_id();
        self.items.insert(id.clone(), Item::Folder { title: title.to_string() });
        id
    }

    pub fn add_record(&mut self, site_id: &str, fields: Map<String, Value>) -> String {
        let id = self.allocate_id();
        self.items.insert(
            id.clone(),
            Item::Record {
                site_id: site_id.to_string(),
                fields,
            },
        );
        id
    }

    /// Records of `site_id` in id order.
    pub fn records_of(&self, site_id: &str) -> Vec<(String, Map<String, Value>)> {
        let mut records: Vec<_> = self
            .items
            .iter()
            .filter_map(|(id, item)| match item {
                Item::Record { site_id: owner, fields } if owner == site_id => {
                    Some((id.clone(), fields.clone()))
                }
                _ => None,
            })
            .collect();
        records.sort_by_key(|(id, _)| id.parse::<u64>().unwrap_or(u64::MAX));
        records
    }

    fn allocate_id(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }
}

/// A small demo tenant: one folder, one table with three records.
pub fn seeded(api_key: &str) -> Platform {
    let mut platform = Platform::new(api_key);
    platform.add_folder("Sales");
    let table = platform.add_table(
        "Results",
        &[("Title", "Title"), ("ClassA", "Department"), ("NumA", "Amount")],
        &["Title", "ClassA", "NumA"],
    );
    for (title, dept, amount) in [("alpha", "Sales", 10), ("beta", "Support", 20), ("gamma", "Sales", 30)] {
        platform.add_record(
            &table,
            Map::from_iter([
                ("Title".to_string(), json!(title)),
                ("ClassA".to_string(), json!(dept)),
                ("NumA".to_string(), json!(amount)),
            ]),
        );
    }
    platform
}

pub type Db = Arc<RwLock<Platform>>;

pub fn app(db: Db) -> Router {
    Router::new()
        .route("/api/items/{id}/{action}", post(items))
        .with_state(db)
}

pub async fn run(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app(db)).await
}

async fn items(
    State(db): State<Db>,
    Path((id, action)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut platform = db.write().await;
    if body.get("apiKey").and_then(Value::as_str) != Some(platform.api_key.as_str()) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    tracing::debug!(%id, %action, "request");
    platform.received.push(Received {
        id: id.clone(),
        action: action.clone(),
        body: body.clone(),
    });

    let item = platform.items.get(&id).cloned().ok_or(StatusCode::NOT_FOUND)?;
    match action.as_str() {
        "getsite" => getsite(&platform, &id, &item).map(Json),
        "get" => get(&platform, &id, &item, &body).map(Json),
        "create" => create(&mut platform, &id, &item, &body).map(Json),
        "update" => update(&mut platform, &id, &item, &body).map(Json),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

fn getsite(platform: &Platform, id: &str, item: &Item) -> Result<Value, StatusCode> {
    let data = match item {
        Item::Table {
            reference_type,
            columns,
            editor_columns,
        } => json!({
            "SiteId": id,
            "ReferenceType": reference_type,
            "SiteSettings": {
                "Columns": columns
                    .iter()
                    .map(|(name, label)| json!({"ColumnName": name, "LabelText": label}))
                    .collect::<Vec<_>>(),
                "EditorColumnHash": {"General": editor_columns},
            },
        }),
        Item::Folder { title } => json!({
            "SiteId": id,
            "Title": title,
            "ReferenceType": "Sites",
            "SiteSettings": {},
        }),
        Item::Record { site_id, .. } => {
            let parent = platform.items.get(site_id).ok_or(StatusCode::NOT_FOUND)?;
            return getsite(platform, site_id, parent);
        }
    };
    Ok(json!({"StatusCode": 200, "Response": {"Data": data}}))
}

fn get(platform: &Platform, id: &str, item: &Item, body: &Value) -> Result<Value, StatusCode> {
    let view = body.get("View").cloned().unwrap_or(Value::Null);
    match item {
        Item::Table { .. } => {
            let offset = body.get("Offset").and_then(Value::as_u64).unwrap_or(0);
            if platform.fail_at_offset == Some(offset) {
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
            let matching: Vec<Value> = platform
                .records_of(id)
                .into_iter()
                .filter(|(_, fields)| matches_filters(fields, &view))
                .map(|(record_id, fields)| render(&record_id, &fields, &view))
                .collect();
            let total = matching.len();
            let data: Vec<Value> = matching
                .into_iter()
                .skip(offset as usize)
                .take(platform.page_size)
                .collect();
            Ok(json!({
                "StatusCode": 200,
                "Response": {
                    "Offset": offset,
                    "PageSize": platform.page_size,
                    "TotalCount": total,
                    "Data": data,
                }
            }))
        }
        Item::Folder { title } => Ok(json!({
            "StatusCode": 200,
            "Response": {"Data": {"SiteId": id, "Title": title}}
        })),
        Item::Record { fields, .. } => Ok(json!({
            "StatusCode": 200,
            "Response": {
                "Offset": 0,
                "PageSize": platform.page_size,
                "TotalCount": 1,
                "Data": [render(id, fields, &view)],
            }
        })),
    }
}

fn create(platform: &mut Platform, id: &str, item: &Item, body: &Value) -> Result<Value, StatusCode> {
    // Like the real platform, creating "in" a record id lands in its table.
    let site_id = match item {
        Item::Table { .. } => id.to_string(),
        Item::Record { site_id, .. } => site_id.clone(),
        Item::Folder { .. } => return Err(StatusCode::BAD_REQUEST),
    };
    let new_id = platform.add_record(&site_id, record_fields(body));
    Ok(json!({"Id": new_id, "StatusCode": 200, "Message": format!("created {new_id}")}))
}

fn update(platform: &mut Platform, id: &str, item: &Item, body: &Value) -> Result<Value, StatusCode> {
    let Item::Record { site_id, fields } = item else {
        return Err(StatusCode::NOT_FOUND);
    };
    let mut fields = fields.clone();
    fields.extend(record_fields(body));
    platform.items.insert(
        id.to_string(),
        Item::Record {
            site_id: site_id.clone(),
            fields,
        },
    );
    Ok(json!({"Id": id, "StatusCode": 200, "Message": format!("updated {id}")}))
}

fn record_fields(body: &Value) -> Map<String, Value> {
    let mut fields = body.as_object().cloned().unwrap_or_default();
    fields.remove("ApiVersion");
    fields.remove("apiKey");
    fields
}

/// KeyValues rendering, restricted to `View.GridColumns` when given.
fn render(id: &str, fields: &Map<String, Value>, view: &Value) -> Value {
    let mut out = Map::new();
    out.insert("ResultId".to_string(), json!(id.parse::<u64>().unwrap_or_default()));
    let grid: Option<Vec<&str>> = view
        .get("GridColumns")
        .and_then(Value::as_array)
        .map(|cols| cols.iter().filter_map(Value::as_str).collect());
    for (key, value) in fields {
        if grid.as_ref().map_or(true, |g| g.contains(&key.as_str())) {
            out.insert(key.clone(), value.clone());
        }
    }
    Value::Object(out)
}

/// Apply `View.ColumnFilterHash` with `View.ColumnFilterSearchTypes`.
/// Columns without a search type use exact matching.
fn matches_filters(fields: &Map<String, Value>, view: &Value) -> bool {
    let Some(filters) = view.get("ColumnFilterHash").and_then(Value::as_object) else {
        return true;
    };
    let search_types = view.get("ColumnFilterSearchTypes");
    filters.iter().all(|(column, wanted)| {
        let actual = match fields.get(column) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return false,
        };
        let candidates: Vec<String> = match wanted {
            Value::Array(values) => values.iter().map(as_text).collect(),
            other => vec![as_text(other)],
        };
        let search_type = search_types
            .and_then(|s| s.get(column))
            .and_then(Value::as_str)
            .unwrap_or("ExactMatch");
        candidates.iter().any(|c| match search_type.trim_end_matches("Multiple") {
            "PartialMatch" => actual.contains(c.as_str()),
            "ForwardMatch" => actual.starts_with(c.as_str()),
            _ => &actual == c,
        })
    })
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
