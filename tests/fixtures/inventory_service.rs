use serde::{Deserialize, Serialize};

#[openapi_definition(
    info(title = "Inventory", version = "1.2.0", description = "Stock keeping service"),
    server(url = "https://inventory.example.com"),
    tag(name = "items", description = "Stock items")
)]
#[security_scheme(name = "bearer", type = "http", scheme = "bearer", bearer_format = "JWT")]
#[application_path("/api")]
pub struct InventoryApi;

#[derive(Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    #[schema(type = "string", format = "decimal", description = "Unit price")]
    pub price: f64,
    pub category: Option<Category>,
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub unit_price: f64,
}

#[derive(Debug, Serialize)]
pub struct Category {
    pub name: String,
    pub parent: Option<Box<Category>>,
    pub children: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct Warehouse {
    pub code: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Serialize)]
pub struct Section {
    pub label: String,
    pub warehouse: Option<Box<Warehouse>>,
}

#[derive(Debug, Deserialize)]
pub struct ItemFilter {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

pub struct ItemResource;

#[path("/items/")]
#[tag(ref = "items")]
impl ItemResource {
    #[get]
    #[operation(summary = "List items")]
    pub async fn list(&self, Query(filter): Query<ItemFilter>) -> Json<Vec<Item>> {
        todo!()
    }

    #[get("/{id}")]
    pub async fn get(&self, #[path_param] id: u64) -> Result<Json<Item>, ApiError> {
        todo!()
    }

    #[post]
    #[consumes("application/json")]
    #[api_response(status = 201, description = "Created")]
    pub async fn create(&self, #[context] ctx: RequestContext, item: NewItem) -> Item {
        todo!()
    }

    #[delete("/{id}")]
    #[security_requirement(name = "bearer")]
    pub async fn delete(&self, #[path_param] id: u64) {}

    fn validate(&self, item: &NewItem) -> bool {
        !item.name.is_empty()
    }
}

pub struct WarehouseResource;

#[path("warehouses")]
impl WarehouseResource {
    #[get("/:id")]
    #[deprecated]
    pub async fn list(&self, Path(id): Path<u64>) -> Json<Warehouse> {
        todo!()
    }
}
