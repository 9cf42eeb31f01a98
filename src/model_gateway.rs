use reqwest::Client;
use std::future::Future;
use std::pin::Pin;

use crate::config::Config;
use crate::model::CompletionResult;
use crate::providers;

pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = CompletionResult> + 'a>>;

/// One prompt in, one completion result out.
pub trait ModelGateway {
    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a>;

    fn model_name(&self) -> &str;
}

/// Gateway backed by the configured HTTP completions endpoint.
pub struct HostModelGateway<'a> {
    client: &'a Client,
    cfg: &'a Config,
}

impl<'a> HostModelGateway<'a> {
    pub fn new(client: &'a Client, cfg: &'a Config) -> Self {
        Self { client, cfg }
    }
}

impl ModelGateway for HostModelGateway<'_> {
    fn complete<'b>(&'b self, prompt: &'b str) -> CompletionFuture<'b> {
        Box::pin(providers::completions::complete(self.client, self.cfg, prompt))
    }

    fn model_name(&self) -> &str {
        &self.cfg.model
    }
}
