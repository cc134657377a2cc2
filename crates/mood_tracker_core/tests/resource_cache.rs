use async_trait::async_trait;
use mood_tracker_core::cache::{
    CacheError, CacheResult, CacheStorage, MemoryCacheStorage, Method, Network, NetworkError,
    ProxyError, ProxyPhase, Request, ResourceCacheProxy, Response, ResponseSource,
    SqliteCacheStorage,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Serves canned responses; unknown URLs and offline mode fail like a dead link.
#[derive(Default)]
struct ScriptedNetwork {
    responses: Mutex<HashMap<String, Response>>,
    offline: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    fn serve(&self, url: &str, response: Response) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls.lock().unwrap().push(request.url.clone());
        if *self.offline.lock().unwrap() {
            return Err(NetworkError::Offline);
        }
        self.responses
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .ok_or_else(|| NetworkError::Transport(format!("no route to {}", request.url)))
    }
}

const MANIFEST: [&str; 3] = [
    "http://app.test/",
    "http://app.test/app.css",
    "http://app.test/manifest.json",
];

fn manifest() -> Vec<String> {
    MANIFEST.iter().map(|url| url.to_string()).collect()
}

fn serve_manifest(network: &ScriptedNetwork) {
    for url in MANIFEST {
        network.serve(url, Response::ok(format!("shell {url}")));
    }
}

/// Delegates to a memory store but rejects every `put`.
#[derive(Default)]
struct ReadOnlyCaches {
    inner: MemoryCacheStorage,
}

#[async_trait]
impl CacheStorage for ReadOnlyCaches {
    async fn open(&self, generation: &str) -> CacheResult<bool> {
        self.inner.open(generation).await
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        self.inner.keys().await
    }

    async fn delete(&self, generation: &str) -> CacheResult<bool> {
        self.inner.delete(generation).await
    }

    async fn put(&self, _: &str, _: &Request, _: Response) -> CacheResult<()> {
        Err(CacheError::LockPoisoned)
    }

    async fn match_in(
        &self,
        generation: &str,
        request: &Request,
    ) -> CacheResult<Option<Response>> {
        self.inner.match_in(generation, request).await
    }

    async fn match_any(&self, request: &Request) -> CacheResult<Option<Response>> {
        self.inner.match_any(request).await
    }
}

fn proxy_with(
    version: &str,
    network: &Arc<ScriptedNetwork>,
    caches: &Arc<dyn CacheStorage>,
) -> ResourceCacheProxy {
    ResourceCacheProxy::new(version, manifest(), network.clone(), Arc::clone(caches))
}

async fn installed_proxy(
    network: &Arc<ScriptedNetwork>,
    caches: &Arc<dyn CacheStorage>,
) -> ResourceCacheProxy {
    serve_manifest(network);
    let proxy = proxy_with("mood-tracker-v1", network, caches);
    proxy.install().await.unwrap();
    proxy.activate().await.unwrap();
    proxy
}

#[tokio::test]
async fn install_populates_generation_with_every_manifest_resource() {
    let network = Arc::new(ScriptedNetwork::default());
    serve_manifest(&network);
    let caches: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let proxy = proxy_with("mood-tracker-v1", &network, &caches);
    assert_eq!(proxy.phase(), ProxyPhase::Parsed);

    proxy.install().await.unwrap();

    assert_eq!(proxy.phase(), ProxyPhase::Installed);
    assert_eq!(caches.keys().await.unwrap(), vec!["mood-tracker-v1"]);
    for url in MANIFEST {
        let cached = caches
            .match_in("mood-tracker-v1", &Request::get(url))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.body, format!("shell {url}").into_bytes());
    }
}

#[tokio::test]
async fn install_aborts_without_partial_generation_when_one_resource_fails() {
    let network = Arc::new(ScriptedNetwork::default());
    network.serve(MANIFEST[0], Response::ok("root"));
    network.serve(MANIFEST[1], Response::new(404, "missing"));
    network.serve(MANIFEST[2], Response::ok("{}"));
    let caches: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let proxy = proxy_with("mood-tracker-v1", &network, &caches);

    let err = proxy.install().await.unwrap_err();

    assert!(matches!(err, ProxyError::InstallFailed { ref url, .. } if url == MANIFEST[1]));
    assert_eq!(proxy.phase(), ProxyPhase::Redundant);
    assert!(caches.keys().await.unwrap().is_empty());
    assert!(matches!(
        proxy.activate().await,
        Err(ProxyError::InvalidPhase {
            phase: ProxyPhase::Redundant,
            ..
        })
    ));
}

#[tokio::test]
async fn fetch_after_failed_install_does_not_create_generation() {
    let network = Arc::new(ScriptedNetwork::default());
    network.serve(MANIFEST[0], Response::ok("root"));
    network.serve("http://app.test/data", Response::ok("[]"));
    let caches: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let proxy = proxy_with("mood-tracker-v2", &network, &caches);
    assert!(proxy.install().await.is_err());
    assert_eq!(proxy.phase(), ProxyPhase::Redundant);

    let served = proxy.fetch(&Request::get("http://app.test/data")).await.unwrap();
    proxy.settle().await;

    assert_eq!(served.source, ResponseSource::Network);
    assert!(caches.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_before_install_passes_through_without_caching() {
    let network = Arc::new(ScriptedNetwork::default());
    network.serve("http://app.test/data", Response::ok("[]"));
    let caches: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let proxy = proxy_with("mood-tracker-v1", &network, &caches);

    proxy.fetch(&Request::get("http://app.test/data")).await.unwrap();
    proxy.settle().await;

    assert_eq!(proxy.phase(), ProxyPhase::Parsed);
    assert!(caches.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_write_keeps_generation_that_already_existed() {
    let network = Arc::new(ScriptedNetwork::default());
    serve_manifest(&network);
    let caches = Arc::new(ReadOnlyCaches::default());
    caches
        .inner
        .put("mood-tracker-v1", &Request::get(MANIFEST[0]), Response::ok("good root"))
        .await
        .unwrap();
    let storage: Arc<dyn CacheStorage> = caches.clone();
    let proxy = proxy_with("mood-tracker-v1", &network, &storage);

    assert!(matches!(proxy.install().await, Err(ProxyError::Cache(_))));

    assert_eq!(proxy.phase(), ProxyPhase::Redundant);
    assert_eq!(storage.keys().await.unwrap(), vec!["mood-tracker-v1"]);
    let kept = storage.match_any(&Request::get(MANIFEST[0])).await.unwrap().unwrap();
    assert_eq!(kept.body, b"good root");
}

#[tokio::test]
async fn failed_write_removes_generation_opened_by_install() {
    let network = Arc::new(ScriptedNetwork::default());
    serve_manifest(&network);
    let caches: Arc<dyn CacheStorage> = Arc::new(ReadOnlyCaches::default());
    let proxy = proxy_with("mood-tracker-v1", &network, &caches);

    assert!(proxy.install().await.is_err());
    assert!(caches.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn install_fails_when_a_resource_is_unreachable() {
    let network = Arc::new(ScriptedNetwork::default());
    network.serve(MANIFEST[0], Response::ok("root"));
    let caches: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let proxy = proxy_with("mood-tracker-v1", &network, &caches);

    assert!(proxy.install().await.is_err());
    assert!(caches.keys().await.unwrap().is_empty());

    serve_manifest(&network);
    proxy.install().await.unwrap();
    assert_eq!(proxy.phase(), ProxyPhase::Installed);
}

#[tokio::test]
async fn activate_leaves_only_current_generation() {
    let network = Arc::new(ScriptedNetwork::default());
    serve_manifest(&network);
    let caches: Arc<dyn CacheStorage> = Arc::new(SqliteCacheStorage::open_in_memory().unwrap());
    caches
        .put("mood-tracker-v0", &Request::get(MANIFEST[0]), Response::ok("old root"))
        .await
        .unwrap();
    caches.open("scratch").await.unwrap();
    let proxy = proxy_with("mood-tracker-v1", &network, &caches);

    proxy.install().await.unwrap();
    let mut removed = proxy.activate().await.unwrap();
    removed.sort();

    assert_eq!(removed, vec!["mood-tracker-v0", "scratch"]);
    assert_eq!(caches.keys().await.unwrap(), vec!["mood-tracker-v1"]);
    assert_eq!(proxy.phase(), ProxyPhase::Activated);
    assert!(proxy.activate().await.unwrap().is_empty());
}

#[tokio::test]
async fn activate_before_install_is_rejected() {
    let network = Arc::new(ScriptedNetwork::default());
    let caches: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let proxy = proxy_with("mood-tracker-v1", &network, &caches);

    assert!(matches!(
        proxy.activate().await,
        Err(ProxyError::InvalidPhase {
            phase: ProxyPhase::Parsed,
            ..
        })
    ));
}

#[tokio::test]
async fn successful_get_returns_live_response_and_caches_copy() {
    let network = Arc::new(ScriptedNetwork::default());
    let live = Response::ok("[1,2,3]").with_header("content-type", "application/json");
    network.serve("http://app.test/api/moods", live.clone());
    let caches: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let proxy = installed_proxy(&network, &caches).await;
    let request = Request::get("http://app.test/api/moods");

    let served = proxy.fetch(&request).await.unwrap();
    proxy.settle().await;

    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(served.response, live);
    let cached = caches
        .match_in("mood-tracker-v1", &request)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached, live);
}

#[tokio::test]
async fn non_get_and_non_200_responses_are_not_cached() {
    let network = Arc::new(ScriptedNetwork::default());
    network.serve("http://app.test/api/moods", Response::ok("created"));
    network.serve("http://app.test/missing", Response::new(404, "nope"));
    let caches: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let proxy = installed_proxy(&network, &caches).await;

    let post = Request::new(Method::Post, "http://app.test/api/moods").with_body("{}");
    let served = proxy.fetch(&post).await.unwrap();
    assert_eq!(served.response.body, b"created");
    let missing = proxy
        .fetch(&Request::get("http://app.test/missing"))
        .await
        .unwrap();
    assert_eq!(missing.response.status, 404);
    proxy.settle().await;

    let cached_get = Request::get("http://app.test/api/moods");
    assert!(caches.match_any(&cached_get).await.unwrap().is_none());
    let cached_missing = Request::get("http://app.test/missing");
    assert!(caches.match_any(&cached_missing).await.unwrap().is_none());
}

#[tokio::test]
async fn offline_request_falls_back_to_cached_copy() {
    let network = Arc::new(ScriptedNetwork::default());
    let caches: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let proxy = installed_proxy(&network, &caches).await;
    network.serve("http://app.test/app.css", Response::ok("body { color: red }"));
    let request = Request::get("http://app.test/app.css");
    let calls_before = network.calls().len();

    let online = proxy.fetch(&request).await.unwrap();
    proxy.settle().await;
    network.set_offline(true);
    let offline = proxy.fetch(&request).await.unwrap();

    assert_eq!(offline.source, ResponseSource::Cache);
    assert_eq!(offline.response, online.response);
    assert_eq!(
        network.calls().len() - calls_before,
        2,
        "network is always tried first"
    );
}

#[tokio::test]
async fn offline_request_without_cache_entry_fails() {
    let network = Arc::new(ScriptedNetwork::default());
    network.set_offline(true);
    let caches: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let proxy = proxy_with("mood-tracker-v1", &network, &caches);

    let err = proxy
        .fetch(&Request::get("http://app.test/never-seen"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProxyError::NoResponse {
            cause: NetworkError::Offline,
            ..
        }
    ));
}

#[tokio::test]
async fn fallback_serves_shell_cached_at_install() {
    let network = Arc::new(ScriptedNetwork::default());
    serve_manifest(&network);
    let caches: Arc<dyn CacheStorage> = Arc::new(SqliteCacheStorage::open_in_memory().unwrap());
    let proxy = proxy_with("mood-tracker-v1", &network, &caches);
    proxy.install().await.unwrap();
    proxy.activate().await.unwrap();

    network.set_offline(true);
    let served = proxy.fetch(&Request::get(MANIFEST[1])).await.unwrap();

    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(served.response.body, format!("shell {}", MANIFEST[1]).into_bytes());
}
