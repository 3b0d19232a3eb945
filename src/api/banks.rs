use axum::{extract::Path, Json};
use serde::Serialize;

use crate::banks::{self, Bank};

#[derive(Serialize)]
pub struct BankNameResponse {
    pub code: String,
    pub name: String,
    pub registered: bool,
}

pub async fn list_banks() -> Json<&'static [Bank]> {
    Json(banks::all())
}

/// Unknown codes echo back as their own name.
pub async fn bank_name(Path(code): Path<String>) -> Json<BankNameResponse> {
    let name = banks::name_of(&code).to_string();
    let registered = banks::lookup(&code).is_some();
    Json(BankNameResponse {
        code,
        name,
        registered,
    })
}
