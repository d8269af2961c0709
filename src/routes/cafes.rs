use askama::Template;
use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{Cafe, CafeInput, CafeView, FieldErrors};
use crate::registry::CafeRegistry;
use crate::{AppState, STATIC_HASH};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    cafes: Vec<CafeView>,
    selected: Option<CafeView>,
    errors: FieldErrors,
    editing_id: Option<i64>,
    form_name: String,
    form_url: String,
    static_hash: &'static str,
}

impl IndexTemplate {
    fn new(cafes: Vec<CafeView>) -> Self {
        Self {
            cafes,
            selected: None,
            errors: FieldErrors::default(),
            editing_id: None,
            form_name: String::new(),
            form_url: String::new(),
            static_hash: STATIC_HASH,
        }
    }
}

#[derive(Deserialize)]
pub struct CafeForm {
    #[serde(default)]
    cafe_name: String,
    #[serde(default)]
    cafe_url: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cafes).post(create_cafe))
        .route("/get-random-cafe", post(pick_random_cafe))
        .route("/mark-visited/{id}", post(mark_visited))
        .route("/update-cafe/{id}", post(update_cafe))
        .route("/delete-cafe/{id}", post(delete_cafe))
}

async fn list_cafes(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let cafes = CafeRegistry::new(&state.db).list_with_status().await?;
    let template = IndexTemplate::new(cafes);
    Ok(Html(template.render()?))
}

/// Re-renders the listing with the submitted values and their errors.
async fn render_invalid(
    registry: &CafeRegistry<'_>,
    form: CafeForm,
    errors: FieldErrors,
    editing_id: Option<i64>,
) -> Result<Response, AppError> {
    let cafes = registry.list_with_status().await?;
    let template = IndexTemplate {
        errors,
        editing_id,
        form_name: form.cafe_name,
        form_url: form.cafe_url,
        ..IndexTemplate::new(cafes)
    };
    Ok(Html(template.render()?).into_response())
}

async fn create_cafe(
    State(state): State<AppState>,
    Form(form): Form<CafeForm>,
) -> Result<Response, AppError> {
    let registry = CafeRegistry::new(&state.db);

    let input = match CafeInput::parse(&form.cafe_name, &form.cafe_url) {
        Ok(input) => input,
        Err(errors) => return render_invalid(&registry, form, errors, None).await,
    };

    registry.add(&input).await?;
    Ok(Redirect::to("/").into_response())
}

async fn pick_random_cafe(State(state): State<AppState>) -> Result<Response, AppError> {
    let registry = CafeRegistry::new(&state.db);

    let Some(picked) = registry.pick_random_unvisited().await? else {
        return Ok(Redirect::to("/").into_response());
    };

    let mut cafes = registry.list_with_status().await?;
    let mut selected = None;
    for cafe in &mut cafes {
        if cafe.id == picked.id {
            cafe.is_selected = true;
            selected = Some(cafe.clone());
        }
    }

    let template = IndexTemplate {
        selected: selected.or_else(|| Some(picked_view(picked))),
        ..IndexTemplate::new(cafes)
    };
    Ok(Html(template.render()?).into_response())
}

// Only reached if the pick was deleted between the two statements.
fn picked_view(picked: Cafe) -> CafeView {
    let mut view = CafeView::new(picked, crate::models::cafe::now_local());
    view.is_selected = true;
    view
}

async fn mark_visited(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    CafeRegistry::new(&state.db).mark_visited(id).await?;
    Ok(Redirect::to("/"))
}

async fn update_cafe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<CafeForm>,
) -> Result<Response, AppError> {
    let registry = CafeRegistry::new(&state.db);

    if registry.get(id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let input = match CafeInput::parse(&form.cafe_name, &form.cafe_url) {
        Ok(input) => input,
        Err(errors) => return render_invalid(&registry, form, errors, Some(id)).await,
    };

    registry.update(id, &input).await?;
    Ok(Redirect::to("/").into_response())
}

async fn delete_cafe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    CafeRegistry::new(&state.db).delete(id).await?;
    Ok(Redirect::to("/"))
}
