use crate::calc::compare_rolls;
use crate::db::Student;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::service;
use serde_json::json;

async fn students_enroll(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = helpers::store(state)?;
    let student = Student {
        roll: helpers::required_str(params, "roll")?,
        name: helpers::required_str(params, "name")?,
        class: helpers::required_str(params, "class")?,
    };
    let reply = helpers::service_reply(params)?;
    let outcome = service::enroll(store, student, &reply).await?;
    Ok(json!(outcome))
}

async fn students_list(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let store = helpers::store(state)?;
    let mut students: Vec<Student> = store.get_all().await?;
    students.sort_by(|a, b| compare_rolls(&a.roll, &b.roll));
    Ok(json!({ "students": students }))
}

async fn students_get(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = helpers::store(state)?;
    let roll = helpers::required_str(params, "roll")?;
    match store.get::<Student>(roll.clone()).await? {
        Some(student) => Ok(json!({ "student": student })),
        None => Err(HandlerErr {
            code: "not_found",
            message: "student not found".to_string(),
            details: Some(json!({ "roll": roll })),
        }),
    }
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "students.enroll" => students_enroll(state, &req.params).await,
        "students.list" => students_list(state).await,
        "students.get" => students_get(state, &req.params).await,
        _ => return None,
    };
    Some(respond(&req.id, res))
}
