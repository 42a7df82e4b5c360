use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Mechanism that actually performs an activity's work. The scheduler calls
/// this once per cache miss; no retries, no timeouts, no cancellation once
/// the call starts.
#[async_trait]
pub trait ActivityBackend: Send + Sync {
    async fn execute(&self, name: &str, input: Option<&str>) -> Result<String, String>;
}

/// Stand-in backend: every activity takes a fixed wall-clock delay and
/// yields a result derived from its name and input.
pub struct FixedDelaySimulator {
    delay: Duration,
}

impl FixedDelaySimulator {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelaySimulator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl ActivityBackend for FixedDelaySimulator {
    async fn execute(&self, name: &str, input: Option<&str>) -> Result<String, String> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("{}-Input-{}-COMPLETE", name, input.unwrap_or("N/A")))
    }
}

// ---------------- Activity registry

/// Trait implemented by named activity handlers registered with an
/// `ActivityRegistry`.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    async fn invoke(&self, input: Option<String>) -> Result<String, String>;
}

/// Function wrapper that implements `ActivityHandler`.
pub struct FnActivity<F, Fut>(pub F)
where
    F: Fn(Option<String>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<String, String>> + Send + 'static;

#[async_trait]
impl<F, Fut> ActivityHandler for FnActivity<F, Fut>
where
    F: Fn(Option<String>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<String, String>> + Send + 'static,
{
    async fn invoke(&self, input: Option<String>) -> Result<String, String> {
        (self.0)(input).await
    }
}

/// Immutable name-to-handler map usable as an `ActivityBackend`. Executing
/// an unregistered name yields `Err("unregistered:<name>")`.
#[derive(Clone, Default)]
pub struct ActivityRegistry {
    inner: Arc<HashMap<String, Arc<dyn ActivityHandler>>>,
}

pub struct ActivityRegistryBuilder {
    map: HashMap<String, Arc<dyn ActivityHandler>>,
}

impl ActivityRegistry {
    pub fn builder() -> ActivityRegistryBuilder {
        ActivityRegistryBuilder { map: HashMap::new() }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActivityHandler>> {
        self.inner.get(name).cloned()
    }

    pub fn list_activity_names(&self) -> Vec<String> {
        self.inner.keys().cloned().collect()
    }
}

#[async_trait]
impl ActivityBackend for ActivityRegistry {
    async fn execute(&self, name: &str, input: Option<&str>) -> Result<String, String> {
        match self.get(name) {
            Some(handler) => handler.invoke(input.map(|s| s.to_string())).await,
            None => Err(format!("unregistered:{}", name)),
        }
    }
}

impl ActivityRegistryBuilder {
    pub fn register<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<String>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<String, String>> + Send + 'static,
    {
        self.map.insert(name.into(), Arc::new(FnActivity(f)));
        self
    }

    /// Typed registration: the handler's input is decoded from the invocation
    /// payload and its output encoded back into the recorded outcome.
    pub fn register_typed<In, Out, F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        In: serde::de::DeserializeOwned + Send + 'static,
        Out: serde::Serialize + Send + 'static,
        F: Fn(In) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Out, String>> + Send + 'static,
    {
        use crate::_typed_codec::{Codec, Json};
        let f_inner = Arc::new(f);
        let wrapper = move |input_s: Option<String>| {
            let f_inner = f_inner.clone();
            async move {
                let payload = input_s.ok_or_else(|| "missing activity input".to_string())?;
                let input: In = Json::decode(&payload)?;
                let out: Out = (f_inner)(input).await?;
                Json::encode(&out)
            }
        };
        self.map.insert(name.into(), Arc::new(FnActivity(wrapper)));
        self
    }

    pub fn build(self) -> ActivityRegistry {
        ActivityRegistry {
            inner: Arc::new(self.map),
        }
    }
}
