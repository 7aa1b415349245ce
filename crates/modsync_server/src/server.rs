//! The ModSync server facade.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{FetchedFile, HandlerContext, HashesReply, PathsReply, RequestHandler};
use crate::http::{HttpRequest, HttpResponse};
use crate::router::{Endpoint, RouteTable};
use modsync_protocol::{decode_fetch_path, encode_json, parse_path_filter, VERSION_HEADER};
use std::sync::Arc;
use tracing::{error, info};

/// The ModSync server.
///
/// Owns the validated configuration and answers requests handed over by
/// an external HTTP listener.
pub struct ModSyncServer {
    handler: RequestHandler,
    routes: RouteTable,
    context: Arc<HandlerContext>,
}

impl ModSyncServer {
    /// Validates the configuration and creates the server.
    ///
    /// Fails if a SyncPath escapes the root, a required bootstrap file is
    /// missing or an exclusion glob is invalid.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let context = Arc::new(HandlerContext::new(config)?);
        let handler = RequestHandler::new(Arc::clone(&context));
        let routes = RouteTable::new()?;

        info!(
            root = ?context.config.root,
            sync_paths = context.config.sync_paths.len(),
            version = %context.config.server_version,
            "modsync server ready"
        );
        Ok(Self {
            handler,
            routes,
            context,
        })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Answers `/modsync/version`.
    pub fn version(&self) -> String {
        self.handler.handle_version()
    }

    /// Answers `/modsync/paths` for a client version header.
    pub fn paths(&self, version_header: Option<&str>) -> PathsReply {
        let client = self.context.client_kind(version_header);
        self.handler.handle_paths(&client)
    }

    /// Answers `/modsync/hashes` for a client version header.
    pub async fn hashes(
        &self,
        version_header: Option<&str>,
        filter: &[String],
    ) -> ServerResult<HashesReply> {
        let client = self.context.client_kind(version_header);
        self.handler.handle_hashes(&client, filter).await
    }

    /// Resolves a file for `/modsync/fetch`.
    pub async fn fetch(&self, relative: &str) -> ServerResult<FetchedFile> {
        self.handler.handle_fetch(relative).await
    }

    /// Handles a request. Never fails: errors become error responses.
    pub async fn handle(&self, request: &HttpRequest) -> HttpResponse {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    method = %request.method,
                    path = %request.path,
                    status = e.status_code(),
                    "error handling request: {e}"
                );
                HttpResponse::error(e.status_code(), format!("Corter-ModSync: {e}"))
            }
        }
    }

    async fn dispatch(&self, request: &HttpRequest) -> ServerResult<HttpResponse> {
        if !request.method.eq_ignore_ascii_case("GET") {
            return Err(ServerError::InvalidRequest(format!(
                "unsupported method {}",
                request.method
            )));
        }

        let endpoint = self
            .routes
            .resolve(&request.path)
            .ok_or_else(|| ServerError::not_found("Unknown route"))?;
        let version = request.header(VERSION_HEADER);

        match endpoint {
            Endpoint::Version => Ok(HttpResponse::json(encode_json(&self.version())?)),
            Endpoint::Paths => Ok(HttpResponse::json(encode_json(&self.paths(version))?)),
            Endpoint::Hashes => {
                let filter = parse_path_filter(&request.query);
                let reply = self.hashes(version, &filter).await?;
                Ok(HttpResponse::json(encode_json(&reply)?))
            }
            Endpoint::Fetch => {
                let relative = decode_fetch_path(&request.path)?;
                let file = self.fetch(&relative).await?;
                Ok(HttpResponse::file(file.path, file.len, file.content_type))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ResponseBody;
    use modsync_core::SyncPath;
    use modsync_protocol::encode_fetch_path;
    use modsync_testkit::ModTree;

    fn server(tree: &ModTree) -> ModSyncServer {
        let config = ServerConfig::new(tree.root())
            .with_sync_paths(vec![SyncPath::new("BepInEx/plugins"), SyncPath::new("ModSync.Updater.exe")]);
        ModSyncServer::new(config).unwrap()
    }

    fn json(response: &HttpResponse) -> serde_json::Value {
        match &response.body {
            ResponseBody::Json(bytes) => serde_json::from_slice(bytes).unwrap(),
            other => panic!("expected json, got {other:?}"),
        }
    }

    fn get(path: &str) -> HttpRequest {
        HttpRequest::get(path).with_header(VERSION_HEADER, "0.9.0")
    }

    #[test]
    fn refuses_missing_bootstrap_files() {
        let tree = ModTree::new().file("BepInEx/plugins/SAIN.dll", b"sain");
        assert!(ModSyncServer::new(ServerConfig::new(tree.root())).is_err());
    }

    #[tokio::test]
    async fn serves_version_and_paths() {
        let tree = ModTree::new().with_bootstrap_files();
        let server = server(&tree);

        let response = server.handle(&get("/modsync/version")).await;
        assert_eq!(response.status, 200);
        assert_eq!(json(&response), serde_json::json!("0.9.0"));

        let response = server.handle(&get("/modsync/paths")).await;
        let paths = json(&response);
        assert_eq!(paths[0]["path"], "BepInEx\\plugins");
        assert_eq!(paths[0]["restartRequired"], true);
    }

    #[tokio::test]
    async fn legacy_clients_get_fallbacks() {
        let tree = ModTree::new().with_bootstrap_files();
        let server = server(&tree);

        let response = server.handle(&HttpRequest::get("/modsync/paths")).await;
        assert_eq!(
            json(&response),
            serde_json::json!(["BepInEx\\plugins\\Corter-ModSync.dll", "ModSync.Updater.exe"])
        );

        let request = HttpRequest::get("/modsync/hashes").with_header(VERSION_HEADER, "0.7.0");
        let response = server.handle(&request).await;
        assert_eq!(json(&response)["ModSync.Updater.exe"]["crc"], 999_999_999);
    }

    #[tokio::test]
    async fn serves_hashes_with_filter() {
        let tree = ModTree::new()
            .with_bootstrap_files()
            .file("BepInEx/plugins/SAIN.dll", b"sain");
        let server = server(&tree);

        let response = server.handle(&get("/modsync/hashes?path=BepInEx%5Cplugins")).await;
        let body = json(&response);
        let plugins = body["BepInEx\\plugins"].as_object().unwrap();
        assert_eq!(plugins.len(), 2);
        assert!(plugins.contains_key("BepInEx\\plugins\\SAIN.dll"));
        assert!(body.get("ModSync.Updater.exe").is_none());
    }

    #[tokio::test]
    async fn serves_files() {
        let tree = ModTree::new()
            .with_bootstrap_files()
            .file("BepInEx/plugins/My Mod/config.json", b"{}");
        let server = server(&tree);

        let response = server
            .handle(&get(&encode_fetch_path("BepInEx/plugins/My Mod/config.json")))
            .await;
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/json");
        assert_eq!(response.content_length(), 2);
        assert!(matches!(response.body, ResponseBody::File { .. }));
    }

    #[tokio::test]
    async fn errors_become_responses() {
        let tree = ModTree::new().with_bootstrap_files();
        let server = server(&tree);

        let response = server.handle(&get("/modsync/nothing")).await;
        assert_eq!(response.status, 404);
        assert_eq!(
            response.body,
            ResponseBody::Text("Corter-ModSync: not found: Unknown route".into())
        );

        let response = server.handle(&get("/modsync/fetch/..%2F..%2Fetc%2Fpasswd")).await;
        assert_eq!(response.status, 404);

        let response = server.handle(&get("/modsync/fetch/")).await;
        assert_eq!(response.status, 400);

        let mut post = get("/modsync/version");
        post.method = "POST".into();
        assert_eq!(server.handle(&post).await.status, 400);
    }
}
