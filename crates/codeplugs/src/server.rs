use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info};
use utoipa::OpenApi;

use codeplugs_model::contact::ContactListSummary;
use codeplugs_model::interchange::{ImportSummary, chirp, filter_list};
use codeplugs_model::{
    Channel, Contact, ContactList, DigitalContact, Id, Page, PageRequest, RoamingChannel,
    RoamingZone, ScanList, Zone,
};

use crate::config::ContactsConfig;
use crate::workspace::{ContactQuery, Grouping, Workspace, WorkspaceError};

#[derive(OpenApi)]
#[openapi(
    info(description = "codeplugs API"),
    paths(
        get_channels,
        save_channel,
        delete_channel,
        reorder_channels,
        get_contacts,
        save_contact,
        delete_contact,
        import_directory,
        get_zones,
        save_zone,
        delete_zone,
        assign_zone,
        get_scan_lists,
        save_scan_list,
        delete_scan_list,
        assign_scan_list,
        get_filter_lists,
        save_filter_list,
        delete_filter_list,
        get_roaming_channels,
        save_roaming_channel,
        delete_roaming_channel,
        get_roaming_zones,
        save_roaming_zone,
        delete_roaming_zone,
        assign_roaming_zone,
        fix_bandwidths,
        resolve_contacts,
        import_csv,
        export_csv,
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub workspace: Arc<Workspace>,
    pub contacts: ContactsConfig,
}

pub fn router(state: AppState) -> Router {
    let router = Router::new()
        .route(
            "/channels",
            get(get_channels).post(save_channel).delete(delete_channel),
        )
        .route("/channels/reorder", post(reorder_channels))
        .route(
            "/contacts",
            get(get_contacts).post(save_contact).delete(delete_contact),
        )
        .route("/digital_contacts", post(import_directory))
        .route("/zones", get(get_zones).post(save_zone).delete(delete_zone))
        .route("/zones/assign", post(assign_zone))
        .route(
            "/scanlists",
            get(get_scan_lists)
                .post(save_scan_list)
                .delete(delete_scan_list),
        )
        .route("/scanlists/assign", post(assign_scan_list))
        .route(
            "/filter_lists",
            get(get_filter_lists)
                .post(save_filter_list)
                .delete(delete_filter_list),
        )
        .route(
            "/roaming/channels",
            get(get_roaming_channels)
                .post(save_roaming_channel)
                .delete(delete_roaming_channel),
        )
        .route(
            "/roaming/zones",
            get(get_roaming_zones)
                .post(save_roaming_zone)
                .delete(delete_roaming_zone),
        )
        .route("/roaming/zones/assign", post(assign_roaming_zone))
        .route("/maintenance/fix_bandwidths", post(fix_bandwidths))
        .route("/maintenance/resolve_contacts", post(resolve_contacts))
        .route("/import", post(import_csv))
        .route("/export", get(export_csv))
        .route("/openapi.json", get(async || Json(ApiDoc::openapi())))
        .with_state(state);

    Router::new().nest("/api", router)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;

    info!("Listening on http://{}", &addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

mod model {
    use serde::{Deserialize, Serialize};
    use utoipa::{IntoParams, ToSchema};

    use codeplugs_model::Id;

    #[derive(Serialize, ToSchema)]
    pub struct Error {
        pub error: String,
    }

    #[derive(Deserialize, IntoParams)]
    #[into_params(parameter_in = Query)]
    pub struct IdQuery {
        pub id: Option<Id>,
    }

    #[derive(Deserialize, ToSchema)]
    pub struct Reorder {
        pub ids: Vec<Id>,
    }

    #[derive(Deserialize, ToSchema)]
    pub struct ScanListAssignment {
        pub scan_list_id: Id,
        pub channel_ids: Vec<Id>,
    }

    #[derive(Deserialize, IntoParams)]
    #[into_params(parameter_in = Query)]
    pub struct ContactsQuery {
        /// `RadioID` selects the DMR user directory, anything else the
        /// user's own talkgroups.
        pub source: Option<String>,
        pub page: Option<i64>,
        pub limit: Option<i64>,
        pub search: Option<String>,
        pub sort: Option<String>,
        pub order: Option<String>,
    }

    #[derive(Deserialize, IntoParams)]
    #[into_params(parameter_in = Query)]
    pub struct FilterListQuery {
        pub id: Option<Id>,
        /// `ids` returns the bare DMR IDs of the list.
        pub mode: Option<String>,
        pub page: Option<i64>,
        pub limit: Option<i64>,
        pub search: Option<String>,
    }

    #[derive(Deserialize, IntoParams)]
    #[into_params(parameter_in = Query)]
    pub struct ImportQuery {
        /// `chirp` for channels, `filter_list` for a list of DMR IDs.
        pub format: String,
        /// Drops every channel before a CHIRP import.
        pub overwrite: Option<bool>,
        /// The filter list whose entries are replaced.
        pub list_name: Option<String>,
    }

    #[derive(Deserialize, IntoParams)]
    #[into_params(parameter_in = Query)]
    pub struct ExportQuery {
        pub format: Option<String>,
        /// Comma separated zone ids to limit the export to.
        pub zone_id: Option<String>,
    }

    #[derive(Default, Serialize, ToSchema)]
    pub struct Count {
        pub updated: usize,
    }
}

impl IntoResponse for WorkspaceError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WorkspaceError::NotFound(kind) => {
                (StatusCode::NOT_FOUND, format!("{kind} not found"))
            }
            WorkspaceError::Conflict(message) => (StatusCode::CONFLICT, message),
            WorkspaceError::Invalid(message) => (StatusCode::BAD_REQUEST, message),
            WorkspaceError::Internal(e) => {
                error!("{:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(model::Error { error: message })).into_response()
    }
}

type ApiResult<T> = Result<T, WorkspaceError>;

fn require_id(id: Option<Id>) -> ApiResult<Id> {
    id.ok_or_else(|| WorkspaceError::Invalid("id is required".to_string()))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn list_groups<G: Grouping + Serialize>(
    workspace: &Workspace,
    id: Option<Id>,
) -> ApiResult<Response> {
    Ok(match id {
        Some(id) => Json(
            workspace
                .group::<G>(id)
                .ok_or(WorkspaceError::NotFound(G::KIND))?,
        )
        .into_response(),
        None => Json(workspace.groups::<G>()).into_response(),
    })
}

fn delete_group<G: Grouping>(workspace: &Workspace, id: Option<Id>) -> ApiResult<StatusCode> {
    workspace.delete_group::<G>(require_id(id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/channels",
    responses((status = 200, body = Vec<Channel>)),
)]
async fn get_channels(State(state): State<AppState>) -> Json<Vec<Channel>> {
    Json(state.workspace.channels())
}

#[utoipa::path(
    post,
    path = "/channels",
    request_body = Channel,
    responses((status = 200, body = Channel), (status = BAD_REQUEST), (status = NOT_FOUND)),
)]
async fn save_channel(
    State(state): State<AppState>,
    Json(channel): Json<Channel>,
) -> ApiResult<Json<Channel>> {
    Ok(Json(state.workspace.save_channel(channel)?))
}

#[utoipa::path(
    delete,
    path = "/channels",
    params(model::IdQuery),
    responses((status = 204), (status = BAD_REQUEST), (status = NOT_FOUND)),
)]
async fn delete_channel(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
) -> ApiResult<StatusCode> {
    state.workspace.delete_channel(require_id(query.id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/channels/reorder",
    request_body = model::Reorder,
    responses((status = 200, body = model::Count)),
)]
async fn reorder_channels(
    State(state): State<AppState>,
    Json(request): Json<model::Reorder>,
) -> ApiResult<Json<model::Count>> {
    let updated = state.workspace.reorder_channels(&request.ids)?;
    Ok(Json(model::Count { updated }))
}

#[utoipa::path(
    get,
    path = "/contacts",
    params(model::ContactsQuery),
    responses(
        (
            status = 200,
            description = "Directory or talkgroup page, depending on `source`",
            body = Page<DigitalContact>,
        ),
        (status = BAD_REQUEST),
    ),
)]
async fn get_contacts(
    State(state): State<AppState>,
    Query(query): Query<model::ContactsQuery>,
) -> ApiResult<Response> {
    let request = ContactQuery {
        search: non_empty(&query.search),
        sort: non_empty(&query.sort),
        descending: query.order.as_deref() == Some("desc"),
        page: PageRequest::new(query.page, query.limit, state.contacts.default_page_size),
    };

    Ok(match query.source.as_deref() {
        Some("RadioID") => Json(state.workspace.directory(&request)?).into_response(),
        _ => Json(state.workspace.contacts(&request)?).into_response(),
    })
}

#[utoipa::path(
    post,
    path = "/contacts",
    request_body = Contact,
    responses((status = 200, body = Contact), (status = BAD_REQUEST), (status = CONFLICT)),
)]
async fn save_contact(
    State(state): State<AppState>,
    Json(contact): Json<Contact>,
) -> ApiResult<Json<Contact>> {
    Ok(Json(state.workspace.save_contact(contact)?))
}

#[utoipa::path(
    delete,
    path = "/contacts",
    params(model::IdQuery),
    responses((status = 204), (status = NOT_FOUND), (status = CONFLICT)),
)]
async fn delete_contact(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
) -> ApiResult<StatusCode> {
    state.workspace.delete_contact(require_id(query.id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/digital_contacts",
    request_body = Vec<DigitalContact>,
    responses((status = 200, body = model::Count), (status = BAD_REQUEST)),
)]
async fn import_directory(
    State(state): State<AppState>,
    Json(entries): Json<Vec<DigitalContact>>,
) -> ApiResult<Json<model::Count>> {
    let updated = state.workspace.upsert_directory(entries)?;
    Ok(Json(model::Count { updated }))
}

#[utoipa::path(
    get,
    path = "/zones",
    params(model::IdQuery),
    responses((status = 200, body = Vec<Zone>), (status = NOT_FOUND)),
)]
async fn get_zones(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
) -> ApiResult<Response> {
    list_groups::<Zone>(&state.workspace, query.id)
}

#[utoipa::path(
    post,
    path = "/zones",
    request_body = Zone,
    responses((status = 200, body = Zone), (status = BAD_REQUEST), (status = NOT_FOUND)),
)]
async fn save_zone(State(state): State<AppState>, Json(zone): Json<Zone>) -> ApiResult<Json<Zone>> {
    Ok(Json(state.workspace.save_group(zone)?))
}

#[utoipa::path(
    delete,
    path = "/zones",
    params(model::IdQuery),
    responses((status = 204), (status = NOT_FOUND)),
)]
async fn delete_zone(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
) -> ApiResult<StatusCode> {
    delete_group::<Zone>(&state.workspace, query.id)
}

#[utoipa::path(
    post,
    path = "/zones/assign",
    params(model::IdQuery),
    request_body = Vec<u32>,
    responses((status = 200, body = Zone), (status = BAD_REQUEST), (status = NOT_FOUND)),
)]
async fn assign_zone(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
    Json(channel_ids): Json<Vec<Id>>,
) -> ApiResult<Json<Zone>> {
    let zone = state
        .workspace
        .assign::<Zone>(require_id(query.id)?, &channel_ids)?;
    Ok(Json(zone))
}

#[utoipa::path(
    get,
    path = "/scanlists",
    params(model::IdQuery),
    responses((status = 200, body = Vec<ScanList>), (status = NOT_FOUND)),
)]
async fn get_scan_lists(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
) -> ApiResult<Response> {
    list_groups::<ScanList>(&state.workspace, query.id)
}

#[utoipa::path(
    post,
    path = "/scanlists",
    request_body = ScanList,
    responses((status = 200, body = ScanList), (status = BAD_REQUEST), (status = NOT_FOUND)),
)]
async fn save_scan_list(
    State(state): State<AppState>,
    Json(list): Json<ScanList>,
) -> ApiResult<Json<ScanList>> {
    Ok(Json(state.workspace.save_group(list)?))
}

#[utoipa::path(
    delete,
    path = "/scanlists",
    params(model::IdQuery),
    responses((status = 204), (status = NOT_FOUND)),
)]
async fn delete_scan_list(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
) -> ApiResult<StatusCode> {
    delete_group::<ScanList>(&state.workspace, query.id)
}

#[utoipa::path(
    post,
    path = "/scanlists/assign",
    request_body = model::ScanListAssignment,
    responses((status = 200, body = ScanList), (status = NOT_FOUND)),
)]
async fn assign_scan_list(
    State(state): State<AppState>,
    Json(request): Json<model::ScanListAssignment>,
) -> ApiResult<Json<ScanList>> {
    let list = state
        .workspace
        .assign::<ScanList>(request.scan_list_id, &request.channel_ids)?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/filter_lists",
    params(model::FilterListQuery),
    responses(
        (
            status = 200,
            description = "List summaries, or the entries of the list given by `id`",
            body = Vec<ContactListSummary>,
        ),
        (status = NOT_FOUND),
    ),
)]
async fn get_filter_lists(
    State(state): State<AppState>,
    Query(query): Query<model::FilterListQuery>,
) -> ApiResult<Response> {
    let Some(id) = query.id else {
        return Ok(Json(state.workspace.contact_lists()).into_response());
    };

    if query.mode.as_deref() == Some("ids") {
        return Ok(Json(state.workspace.contact_list_ids(id)?).into_response());
    }

    let page = PageRequest::new(query.page, query.limit, state.contacts.filter_list_page_size);
    let entries = state
        .workspace
        .contact_list_entries(id, non_empty(&query.search), page)?;

    Ok(Json(entries).into_response())
}

#[utoipa::path(
    post,
    path = "/filter_lists",
    request_body = ContactList,
    responses((status = 200, body = ContactListSummary), (status = BAD_REQUEST)),
)]
async fn save_filter_list(
    State(state): State<AppState>,
    Json(list): Json<ContactList>,
) -> ApiResult<Json<ContactListSummary>> {
    Ok(Json(state.workspace.save_contact_list(list)?))
}

#[utoipa::path(
    delete,
    path = "/filter_lists",
    params(model::IdQuery),
    responses((status = 204), (status = NOT_FOUND)),
)]
async fn delete_filter_list(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
) -> ApiResult<StatusCode> {
    state.workspace.delete_contact_list(require_id(query.id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/roaming/channels",
    responses((status = 200, body = Vec<RoamingChannel>)),
)]
async fn get_roaming_channels(State(state): State<AppState>) -> Json<Vec<RoamingChannel>> {
    Json(state.workspace.roaming_channels())
}

#[utoipa::path(
    post,
    path = "/roaming/channels",
    request_body = RoamingChannel,
    responses((status = 200, body = RoamingChannel), (status = BAD_REQUEST), (status = NOT_FOUND)),
)]
async fn save_roaming_channel(
    State(state): State<AppState>,
    Json(channel): Json<RoamingChannel>,
) -> ApiResult<Json<RoamingChannel>> {
    Ok(Json(state.workspace.save_roaming_channel(channel)?))
}

#[utoipa::path(
    delete,
    path = "/roaming/channels",
    params(model::IdQuery),
    responses((status = 204), (status = NOT_FOUND)),
)]
async fn delete_roaming_channel(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
) -> ApiResult<StatusCode> {
    state.workspace.delete_roaming_channel(require_id(query.id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/roaming/zones",
    params(model::IdQuery),
    responses((status = 200, body = Vec<RoamingZone>), (status = NOT_FOUND)),
)]
async fn get_roaming_zones(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
) -> ApiResult<Response> {
    list_groups::<RoamingZone>(&state.workspace, query.id)
}

#[utoipa::path(
    post,
    path = "/roaming/zones",
    request_body = RoamingZone,
    responses((status = 200, body = RoamingZone), (status = BAD_REQUEST), (status = NOT_FOUND)),
)]
async fn save_roaming_zone(
    State(state): State<AppState>,
    Json(zone): Json<RoamingZone>,
) -> ApiResult<Json<RoamingZone>> {
    Ok(Json(state.workspace.save_group(zone)?))
}

#[utoipa::path(
    delete,
    path = "/roaming/zones",
    params(model::IdQuery),
    responses((status = 204), (status = NOT_FOUND)),
)]
async fn delete_roaming_zone(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
) -> ApiResult<StatusCode> {
    delete_group::<RoamingZone>(&state.workspace, query.id)
}

#[utoipa::path(
    post,
    path = "/roaming/zones/assign",
    params(model::IdQuery),
    request_body = Vec<u32>,
    responses((status = 200, body = RoamingZone), (status = BAD_REQUEST), (status = NOT_FOUND)),
)]
async fn assign_roaming_zone(
    State(state): State<AppState>,
    Query(query): Query<model::IdQuery>,
    Json(channel_ids): Json<Vec<Id>>,
) -> ApiResult<Json<RoamingZone>> {
    let zone = state
        .workspace
        .assign::<RoamingZone>(require_id(query.id)?, &channel_ids)?;
    Ok(Json(zone))
}

#[utoipa::path(
    post,
    path = "/maintenance/fix_bandwidths",
    responses((status = 200, body = model::Count)),
)]
async fn fix_bandwidths(State(state): State<AppState>) -> ApiResult<Json<model::Count>> {
    let updated = state.workspace.fix_bandwidths()?;
    Ok(Json(model::Count { updated }))
}

#[utoipa::path(
    post,
    path = "/maintenance/resolve_contacts",
    responses((status = 200, body = model::Count)),
)]
async fn resolve_contacts(State(state): State<AppState>) -> ApiResult<Json<model::Count>> {
    let updated = state.workspace.resolve_contacts()?;
    Ok(Json(model::Count { updated }))
}

#[utoipa::path(
    post,
    path = "/import",
    params(model::ImportQuery),
    request_body(content = String, content_type = "text/csv"),
    responses((status = 200, body = ImportSummary), (status = BAD_REQUEST)),
)]
async fn import_csv(
    State(state): State<AppState>,
    Query(query): Query<model::ImportQuery>,
    body: String,
) -> ApiResult<Json<ImportSummary>> {
    let summary = match query.format.as_str() {
        "chirp" => {
            let channels = chirp::read(body.as_bytes())?;
            let overwrite = query.overwrite.unwrap_or_default();

            state.workspace.import_channels(channels, overwrite)?
        }
        "filter_list" => {
            let name = non_empty(&query.list_name)
                .ok_or_else(|| WorkspaceError::Invalid("list_name is required".to_string()))?;
            let ids = filter_list::read(body.as_bytes())?;
            let list = state.workspace.import_contact_list(name, ids)?;

            ImportSummary {
                imported: list.entry_count,
                skipped: 0,
            }
        }
        format => {
            return Err(WorkspaceError::Invalid(format!(
                "unsupported import format {format}"
            )));
        }
    };

    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/export",
    params(model::ExportQuery),
    responses(
        (status = 200, body = String, content_type = "text/csv"),
        (status = BAD_REQUEST),
    ),
)]
async fn export_csv(
    State(state): State<AppState>,
    Query(query): Query<model::ExportQuery>,
) -> ApiResult<Response> {
    if let Some(format) = non_empty(&query.format)
        && format != "chirp"
    {
        return Err(WorkspaceError::Invalid(format!(
            "unsupported export format {format}"
        )));
    }

    let zone_ids = match non_empty(&query.zone_id) {
        Some(ids) => ids
            .split(',')
            .map(|id| {
                id.trim()
                    .parse::<Id>()
                    .map_err(|_| WorkspaceError::Invalid(format!("invalid zone id {id}")))
            })
            .collect::<ApiResult<Vec<_>>>()?,
        None => vec![],
    };

    let channels = state.workspace.export_channels(&zone_ids);

    let mut csv = Vec::new();
    let count = chirp::write(&channels, &mut csv)
        .map_err(|e| WorkspaceError::Internal(anyhow::Error::new(e)))?;

    info!(count, "Exported channels");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"chirp_export.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
