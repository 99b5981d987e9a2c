//! Editor instances persisted across requests
//!
//! The first request of an editor stores its configuration in the session
//! under a fresh identifier. Later requests carry that identifier and get a
//! copy of the stored configuration with a live connection attached. Stored
//! instances idle for longer than the inactivity timeout are swept lazily,
//! whenever an editor is initialized. The URL an instance was created at
//! outlives it for the retention period, so late requests can start over there.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dbedit_core::Connection;
use dbedit_schema::EditorConfig;
use dbedit_templates::HtmlTemplates;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editor::Editor;
use crate::error::ServiceResult;
use crate::request::EditorRequest;
use crate::settings::{EditorSettings, HANDLE_PARAM};
use crate::store::{
    INITIAL_URI_PREFIX, OBJECTS_PREFIX, SessionStore, initial_uri_key, object_key, params_key,
};
use crate::url::EditorUrl;

/// Session representation of an editor; holds no live resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInstance {
    pub id: String,
    pub config: EditorConfig,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

/// URL of the request that created an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct InitialUri {
    uri: String,
    recorded_at: DateTime<Utc>,
}

/// Outcome of [`EditorCache::init`]
pub enum InitOutcome {
    Ready(Editor),
    /// The identifier is unknown, most likely evicted; the client must start
    /// over at `location`
    Restart { location: String },
}

impl std::fmt::Debug for InitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(editor) => f.debug_tuple("Ready").field(&editor.id()).finish(),
            Self::Restart { location } => f
                .debug_struct("Restart")
                .field("location", location)
                .finish(),
        }
    }
}

pub struct EditorCache {
    store: Arc<dyn SessionStore>,
    settings: EditorSettings,
    templates: Arc<HtmlTemplates>,
}

impl EditorCache {
    pub fn new(store: Arc<dyn SessionStore>, settings: EditorSettings) -> ServiceResult<Self> {
        Ok(Self {
            store,
            settings,
            templates: Arc::new(HtmlTemplates::new()?),
        })
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Create the editor of this request or restore it from the session.
    ///
    /// `config` is only used when the request carries no instance identifier.
    pub fn init(
        &self,
        connection: Arc<dyn Connection>,
        request: &EditorRequest,
        config: EditorConfig,
    ) -> ServiceResult<InitOutcome> {
        self.init_at(connection, request, config, Utc::now())
    }

    #[tracing::instrument(skip_all, fields(uri = %request.uri))]
    pub fn init_at(
        &self,
        connection: Arc<dyn Connection>,
        request: &EditorRequest,
        config: EditorConfig,
        now: DateTime<Utc>,
    ) -> ServiceResult<InitOutcome> {
        self.sweep(now)?;

        let Some(id) = request.param(HANDLE_PARAM).filter(|id| !id.is_empty()) else {
            config.validate()?;
            let instance = StoredInstance {
                id: Uuid::new_v4().simple().to_string(),
                config,
                created_at: now,
                last_access: now,
            };
            self.save(&instance)?;
            let initial = InitialUri {
                uri: request.uri.clone(),
                recorded_at: now,
            };
            self.store
                .set(&initial_uri_key(&instance.id), serde_json::to_value(initial)?)?;
            tracing::info!(id = %instance.id, table = %instance.config.table, "created editor instance");
            return Ok(InitOutcome::Ready(self.editor(instance, connection, true)));
        };

        match self.load(id)? {
            Some(mut instance) => {
                instance.last_access = now;
                self.save(&instance)?;
                tracing::debug!(id = %id, "restored editor instance");
                Ok(InitOutcome::Ready(self.editor(instance, connection, false)))
            }
            None => {
                let location = match self.initial_uri(id)? {
                    Some(initial) => initial.uri,
                    None => EditorUrl::new(&request.uri, &self.settings, id).stripped(),
                };
                tracing::info!(id = %id, location = %location, "unknown editor instance, restarting");
                Ok(InitOutcome::Restart { location })
            }
        }
    }

    /// Remove every instance idle for longer than the inactivity timeout.
    ///
    /// Recorded initial URLs are kept so evicted editors can restart, until
    /// they are older than the retention period. Returns the number of
    /// evicted instances.
    pub fn sweep(&self, now: DateTime<Utc>) -> ServiceResult<usize> {
        let timeout = i64::try_from(self.settings.inactivity_timeout_secs).unwrap_or(i64::MAX);
        let mut evicted = 0;
        for key in self.store.keys(OBJECTS_PREFIX)? {
            let id = &key[OBJECTS_PREFIX.len()..];
            let expired = match self.load(id)? {
                Some(instance) => {
                    now.signed_duration_since(instance.last_access).num_seconds() > timeout
                }
                None => true,
            };
            if expired {
                self.store.remove(&key)?;
                self.store.remove(&params_key(id))?;
                evicted += 1;
                tracing::debug!(id = %id, "evicted idle editor instance");
            }
        }

        let retention =
            i64::try_from(self.settings.initial_uri_retention_secs).unwrap_or(i64::MAX);
        for key in self.store.keys(INITIAL_URI_PREFIX)? {
            let id = &key[INITIAL_URI_PREFIX.len()..];
            if self.store.get(&object_key(id))?.is_some() {
                continue;
            }
            let stale = match self.initial_uri(id)? {
                Some(initial) => {
                    now.signed_duration_since(initial.recorded_at).num_seconds() > retention
                }
                None => true,
            };
            if stale {
                self.store.remove(&key)?;
                tracing::debug!(id = %id, "forgot initial URL of evicted instance");
            }
        }
        Ok(evicted)
    }

    fn initial_uri(&self, id: &str) -> ServiceResult<Option<InitialUri>> {
        let Some(value) = self.store.get(&initial_uri_key(id))? else {
            return Ok(None);
        };
        Ok(serde_json::from_value(value).ok())
    }

    /// Stored instance of `id`; corrupt entries count as missing
    pub fn load(&self, id: &str) -> ServiceResult<Option<StoredInstance>> {
        let Some(value) = self.store.get(&object_key(id))? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(instance) => Ok(Some(instance)),
            Err(err) => {
                tracing::warn!(id = %id, error = %err, "discarding unreadable editor instance");
                self.store.remove(&object_key(id))?;
                Ok(None)
            }
        }
    }

    fn save(&self, instance: &StoredInstance) -> ServiceResult<()> {
        self.store
            .set(&object_key(&instance.id), serde_json::to_value(instance)?)
    }

    fn editor(
        &self,
        instance: StoredInstance,
        connection: Arc<dyn Connection>,
        is_new: bool,
    ) -> Editor {
        Editor::new(
            instance,
            is_new,
            connection,
            self.store.clone(),
            self.settings.clone(),
            self.templates.clone(),
        )
    }
}
