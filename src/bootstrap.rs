//! Choosing where the initial data comes from.
//!
//! Priority: shared link, then the remote public document (when asked for),
//! then the persisted local copy, then an empty seed. A source that fails is
//! reported through [`Bootstrap::notice`] and the next source is used.

use crate::{
    api::PublicDataClient,
    codec::{Compressor, SharingCodec},
    error::{DataOrigin, LoadError},
    model::HistoricalData,
    store::read_persisted,
    traits::Storage,
};

/// Resolved initial data.
#[derive(Debug, Clone, PartialEq)]
pub struct Bootstrap {
    pub data: HistoricalData,
    pub origin: DataOrigin,
    /// Problem to show the user, if a preferred source could not be used.
    pub notice: Option<LoadError>,
}

impl Bootstrap {
    fn seed(notice: Option<LoadError>) -> Self {
        Self {
            data: HistoricalData::new(),
            origin: DataOrigin::Seed,
            notice,
        }
    }
}

/// Resolve from a shared token (if any), else local storage, else the seed.
pub fn bootstrap<C: Compressor>(
    storage: &dyn Storage,
    codec: &SharingCodec<C>,
    shared_token: Option<&str>,
) -> Bootstrap {
    let notice = match shared_token.map(|token| from_token(codec, token)) {
        Some(Ok(resolved)) => return resolved,
        Some(Err(notice)) => Some(notice),
        None => None,
    };

    with_notice(from_local(storage), notice)
}

/// Like [`bootstrap`], but tries `client` before local storage.
pub async fn bootstrap_remote<C: Compressor>(
    storage: &dyn Storage,
    codec: &SharingCodec<C>,
    shared_token: Option<&str>,
    client: &PublicDataClient,
) -> Bootstrap {
    if let Some(token) = shared_token {
        match from_token(codec, token) {
            Ok(resolved) => return resolved,
            Err(notice) => return with_notice(from_local(storage), Some(notice)),
        }
    }

    match client.fetch_store().await {
        Ok(data) => {
            tracing::info!("Loaded {} dates from {}", data.len(), client.url());
            Bootstrap {
                data,
                origin: DataOrigin::Remote,
                notice: None,
            }
        }
        Err(err) => {
            tracing::error!("{}", err);
            with_notice(from_local(storage), Some(err))
        }
    }
}

fn from_token<C: Compressor>(codec: &SharingCodec<C>, token: &str) -> Result<Bootstrap, LoadError> {
    match codec.decode(token) {
        Ok(data) => {
            tracing::info!("Loaded {} dates from shared link", data.len());
            Ok(Bootstrap {
                data,
                origin: DataOrigin::SharedLink,
                notice: None,
            })
        }
        Err(e) => {
            let err = LoadError::LoadFailed {
                origin: DataOrigin::SharedLink,
                reason: e.to_string(),
            };
            tracing::error!("{}", err);
            Err(err)
        }
    }
}

fn from_local(storage: &dyn Storage) -> Bootstrap {
    match read_persisted(storage) {
        Ok(Some(data)) => Bootstrap {
            data,
            origin: DataOrigin::LocalStorage,
            notice: None,
        },
        Ok(None) => Bootstrap::seed(None),
        Err(err) => {
            tracing::error!("{}", err);
            Bootstrap::seed(Some(err))
        }
    }
}

// The earlier source's failure is what the user asked for, so it wins.
fn with_notice(resolved: Bootstrap, notice: Option<LoadError>) -> Bootstrap {
    Bootstrap {
        notice: notice.or(resolved.notice),
        ..resolved
    }
}
