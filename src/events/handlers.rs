use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    error::{AppError, AppResult},
    events::dto::{
        parse_event_date, EventQuery, EventView, TagNamesRequest, TagQuery, UpdateEventRequest,
    },
    images::services::{discard_image, store_event_image, UploadItem},
    state::AppState,
    users::dto::MessageResponse,
};

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events/create", post(create_event))
        .route("/events/update/:id", post(update_event))
        .route("/events/query", get(query_events))
        .route("/events/delete/:id", post(delete_event))
        .route("/events/tags/add/:id", post(add_event_tags))
        .route("/events/tags/remove/:id", post(remove_event_tags))
        .route("/events/query_by_tag", get(query_events_by_tag))
}

/// Fields collected from the create form.
#[derive(Default)]
struct CreateForm {
    user_id: String,
    content: String,
    is_public: bool,
    event_date: Option<String>,
    image: Option<UploadItem>,
}

async fn read_create_form(mut mp: Multipart) -> AppResult<CreateForm> {
    let mut form = CreateForm::default();
    while let Some(field) = mp.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => form.user_id = field.text().await?,
            "content" => form.content = field.text().await?,
            "is_public" => form.is_public = field.text().await?.trim().eq_ignore_ascii_case("true"),
            "event_date" => {
                let raw = field.text().await?;
                if !raw.trim().is_empty() {
                    form.event_date = Some(raw);
                }
            }
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await?;
                // browsers send an empty part when no file was picked
                if !body.is_empty() {
                    form.image = Some(UploadItem {
                        file_name,
                        content_type,
                        body,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// POST /events/create (multipart: user_id, content, is_public, event_date?, image?)
#[instrument(skip(state, mp))]
pub async fn create_event(
    State(state): State<AppState>,
    mp: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<EventView>> {
    let form = read_create_form(mp?).await?;
    // checked again by the service; here so bad input never reaches storage
    if form.user_id.trim().is_empty() {
        return Err(AppError::invalid("user_id empty"));
    }
    if form.content.trim().is_empty() {
        return Err(AppError::invalid("content empty"));
    }
    let event_date = form
        .event_date
        .as_deref()
        .map(parse_event_date)
        .transpose()?;

    let stored = match form.image {
        Some(image) => {
            Some(store_event_image(state.storage.as_ref(), form.user_id.trim(), image).await?)
        }
        None => None,
    };
    let images = stored.iter().map(|s| s.public_url.clone()).collect();

    let created = state
        .events
        .create_event(&form.user_id, &form.content, images, form.is_public, event_date)
        .await;
    match created {
        Ok(event) => Ok(Json(event.into())),
        Err(e) => {
            if let Some(stored) = &stored {
                discard_image(state.storage.as_ref(), stored).await;
            }
            Err(e)
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> AppResult<Json<EventView>> {
    let Json(req) = payload?;
    let event = state.events.update_event(&id, req.into_update()?).await?;
    Ok(Json(event.into()))
}

#[instrument(skip(state, query))]
pub async fn query_events(
    State(state): State<AppState>,
    query: Result<Query<EventQuery>, QueryRejection>,
) -> AppResult<Json<Vec<EventView>>> {
    let Query(q) = query?;
    let events = state.events.list_events_by_user(&q.user_id).await?;
    Ok(Json(events.into_iter().map(EventView::from).collect()))
}

/// Any request body is ignored.
#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.events.delete_event(&id).await?;
    Ok(Json(MessageResponse {
        message: "event deleted",
    }))
}

#[instrument(skip(state, payload))]
pub async fn add_event_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TagNamesRequest>, JsonRejection>,
) -> AppResult<Json<EventView>> {
    let Json(req) = payload?;
    info!(names = req.names.len(), "add event tags");
    let event = state.events.add_event_tags(&id, &req.names).await?;
    Ok(Json(event.into()))
}

#[instrument(skip(state, payload))]
pub async fn remove_event_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TagNamesRequest>, JsonRejection>,
) -> AppResult<Json<EventView>> {
    let Json(req) = payload?;
    info!(names = req.names.len(), "remove event tags");
    let event = state.events.remove_event_tags(&id, &req.names).await?;
    Ok(Json(event.into()))
}

#[instrument(skip(state, query))]
pub async fn query_events_by_tag(
    State(state): State<AppState>,
    query: Result<Query<TagQuery>, QueryRejection>,
) -> AppResult<Json<Vec<EventView>>> {
    let Query(q) = query?;
    let events = state.events.list_events_by_tag(&q.tag).await?;
    Ok(Json(events.into_iter().map(EventView::from).collect()))
}
