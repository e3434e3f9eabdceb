//! The derivative dispenser: serve-from-cache-or-generate.
//!
//! [`Dispenser`] answers every demand the same way: compute the cache key,
//! serve the entry if one exists, otherwise read the source, derive, persist
//! at the key, and serve what actually landed in the store. Served bytes are
//! always read back through the store rather than trusted from memory, so a
//! response is byte-for-byte what the next request will get.
//!
//! Two concurrent requests for the same uncached derivative may both miss
//! and both generate. Both produce the same bytes at the same key, so the
//! race is benign and no cross-request locking is held.
//!
//! Recoverable trouble (unreadable source, cache entry vanishing between
//! check and read) goes through [`FallbackPolicy`]; everything else
//! propagates as [`DispenseError`].

use thiserror::Error;

use crate::config::DispenserConfig;
use crate::demand::{Dummy, Resize, SourceRef, ThumbMethod, Thumbnail};
use crate::imaging::{
    DecodedImage, EncodingFormat, ImageProcessor, ProcessorError, Quality, scale_plan,
    sniff_media_type,
};
use crate::keys;
use crate::logging::Logger;
use crate::response::{
    EntryFacts, FALLBACK_HEADER, ImageResponse, ResponsePolicy, Validators, conditional_response,
};
use crate::storage::{Storage, StorageError, content_hash};

#[derive(Error, Debug)]
pub enum DispenseError {
    /// Cache directories could not be prepared. Raised at construction; the
    /// dispenser is never handed out in a state where writes would fail.
    #[error("cache store unavailable: {0}")]
    StorageUnavailable(StorageError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A resize or thumbnail demand reached the dispenser with an unresolved
    /// width or height. Callers resolve route values first.
    #[error("width and height must both be resolved to dispense '{context}'")]
    UnresolvedDimensions { context: String },

    #[error(transparent)]
    Processing(#[from] ProcessorError),
}

/// What to do when a derivative cannot be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Surface "not found".
    Strict,
    /// Serve the unprocessed original from the upload store, marked with
    /// [`FALLBACK_HEADER`].
    Lenient,
}

impl FallbackPolicy {
    fn from_config(serve_original_on_failure: bool) -> Self {
        if serve_original_on_failure {
            Self::Lenient
        } else {
            Self::Strict
        }
    }
}

/// Outcome of a dispense call: the decoded derivative itself when the demand
/// asked for the raw object, otherwise an HTTP-shaped response.
#[derive(Debug)]
pub enum Dispensed {
    Image(DecodedImage),
    Response(ImageResponse),
}

impl Dispensed {
    pub fn as_response(&self) -> Option<&ImageResponse> {
        match self {
            Self::Response(r) => Some(r),
            Self::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&DecodedImage> {
        match self {
            Self::Image(i) => Some(i),
            Self::Response(_) => None,
        }
    }
}

/// Derivative cache over a storage backend and an image processor.
///
/// All state is fixed at construction. The cache store holds generated
/// derivatives under two subtrees (resized, thumbnails) that this component
/// alone writes to; the upload store is only ever read, to resolve and fetch
/// original images.
pub struct Dispenser<'a> {
    cache: &'a dyn Storage,
    uploads: &'a dyn Storage,
    processor: &'a dyn ImageProcessor,
    logger: &'a dyn Logger,
    resized_root: String,
    thumbs_root: String,
    format: EncodingFormat,
    quality: Quality,
    policy: ResponsePolicy,
    fallback: FallbackPolicy,
}

impl<'a> Dispenser<'a> {
    /// Build a dispenser, creating both cache subtrees up front so a failure
    /// to prepare them is loud instead of deferred to the first write.
    pub fn new(
        cache: &'a dyn Storage,
        uploads: &'a dyn Storage,
        processor: &'a dyn ImageProcessor,
        logger: &'a dyn Logger,
        config: &DispenserConfig,
    ) -> Result<Self, DispenseError> {
        cache
            .make_directory(&config.cache.resized_dir)
            .map_err(DispenseError::StorageUnavailable)?;
        cache
            .make_directory(&config.cache.thumbs_dir)
            .map_err(DispenseError::StorageUnavailable)?;

        Ok(Self {
            cache,
            uploads,
            processor,
            logger,
            resized_root: config.cache.resized_dir.clone(),
            thumbs_root: config.cache.thumbs_dir.clone(),
            format: config.encoding.format,
            quality: config.quality(),
            policy: config.response_policy(),
            fallback: FallbackPolicy::from_config(config.fallback.serve_original_on_failure),
        })
    }

    /// Dispense a resized derivative.
    ///
    /// Sizing depends on the demand's two flags: proportional scaling when
    /// the aspect ratio is maintained, independent per-axis scaling when not,
    /// and in either mode enlargement beyond the source only when upscaling
    /// is allowed.
    pub fn get_resized(
        &self,
        demand: &Resize,
        validators: &Validators,
    ) -> Result<Dispensed, DispenseError> {
        let (width, height) = resolved(demand.width, demand.height, &demand.source.name)?;
        let key = keys::resize_key(
            &self.resized_root,
            &demand.source.name,
            width,
            height,
            demand.maintain_aspect,
            demand.allow_upscale,
        );

        let maintain_aspect = demand.maintain_aspect;
        let allow_upscale = demand.allow_upscale;
        self.dispense(&key, &demand.source, demand.return_object, validators, |img| {
            let (w, h) = scale_plan(
                img.dimensions(),
                (width, height),
                maintain_aspect,
                allow_upscale,
            );
            img.scale_exact(w, h)
        })
    }

    /// Dispense a thumbnail derivative.
    ///
    /// An invalid method is rejected before the cache or the processor is
    /// touched: logged as a warning, answered "not found".
    pub fn get_thumbnail(
        &self,
        demand: &Thumbnail,
        validators: &Validators,
    ) -> Result<Dispensed, DispenseError> {
        let Some(method) = demand.method() else {
            self.logger.warning(
                "thumbnail demand rejected: unknown method",
                &format!("method: {}, source: {}", demand.method, demand.source.name),
            );
            return Ok(Dispensed::Response(ImageResponse::not_found()));
        };

        let (width, height) = resolved(demand.width, demand.height, &demand.source.name)?;
        let key = keys::thumbnail_key(
            &self.thumbs_root,
            &demand.source.name,
            width,
            height,
            method,
        );

        self.dispense(&key, &demand.source, demand.return_object, validators, |img| {
            match method {
                ThumbMethod::Crop => img.crop_center(width, height),
                ThumbMethod::Fit => img.fit(width, height),
            }
        })
    }

    /// Synthesize a placeholder canvas. Never cached: there is no source to
    /// key on and regeneration is cheap. Backend errors propagate.
    pub fn get_dummy(&self, demand: &Dummy) -> Result<DecodedImage, DispenseError> {
        let (width, height) = resolved(demand.width, demand.height, "dummy image")?;
        Ok(self.processor.create_canvas(width, height, &demand.color)?)
    }

    /// Delete both derivative subtrees. Returns `true` only when both
    /// deletions succeed; missing directories count as already empty.
    pub fn empty_cache(&self) -> bool {
        let resized = self.cache.delete_directory(&self.resized_root);
        let thumbs = self.cache.delete_directory(&self.thumbs_root);
        resized && thumbs
    }

    /// Shared hit/miss/write-through flow.
    fn dispense(
        &self,
        key: &str,
        source: &SourceRef,
        return_object: bool,
        validators: &Validators,
        derive: impl FnOnce(DecodedImage) -> DecodedImage,
    ) -> Result<Dispensed, DispenseError> {
        if self.cache.exists(key) {
            return match self.cache.get(key) {
                Ok(body) => {
                    if return_object {
                        self.reload_entry(key, source)
                    } else {
                        self.respond(key, body, validators, source)
                    }
                }
                // Entry vanished between check and read
                Err(e) => Ok(self.trouble(source, key, &e.to_string())),
            };
        }

        let locator = self.uploads.url(&source.locator);
        let decoded = match self.processor.read(&locator) {
            Ok(img) => img,
            Err(ProcessorError::UnreadableSource { reason, .. }) => {
                return Ok(self.trouble(source, key, &reason));
            }
            Err(fatal) => return Err(fatal.into()),
        };

        let derived = derive(decoded);
        let bytes = derived.encode(self.format, self.quality)?;
        self.cache.put(key, &bytes)?;

        if return_object {
            return Ok(Dispensed::Image(derived));
        }
        match self.cache.get(key) {
            Ok(body) => self.respond(key, body, validators, source),
            Err(e) => Ok(self.trouble(source, key, &e.to_string())),
        }
    }

    /// Decode an existing cache entry for a raw-object demand.
    fn reload_entry(&self, key: &str, source: &SourceRef) -> Result<Dispensed, DispenseError> {
        match self.processor.read(&self.cache.absolute_path(key)) {
            Ok(img) => Ok(Dispensed::Image(img)),
            Err(ProcessorError::UnreadableSource { reason, .. }) => {
                Ok(self.trouble(source, key, &reason))
            }
            Err(fatal) => Err(fatal.into()),
        }
    }

    /// Build the response for a cache entry, revalidating against the
    /// request's validators. Hash and mtime come from the store, not from
    /// the in-memory bytes.
    fn respond(
        &self,
        key: &str,
        body: Vec<u8>,
        validators: &Validators,
        source: &SourceRef,
    ) -> Result<Dispensed, DispenseError> {
        let etag = match content_hash(self.cache, key) {
            Ok(h) => h,
            Err(e) => return Ok(self.trouble(source, key, &e.to_string())),
        };
        let last_modified = match self.cache.last_modified(key) {
            Ok(t) => t,
            Err(e) => return Ok(self.trouble(source, key, &e.to_string())),
        };

        let media_type = sniff_media_type(&body).unwrap_or_else(|| self.format.media_type());
        let filename = key.rsplit('/').next().unwrap_or(key);
        let facts = EntryFacts {
            filename,
            media_type,
            etag: &etag,
            last_modified,
        };
        Ok(Dispensed::Response(conditional_response(
            &facts,
            body,
            validators,
            &self.policy,
        )))
    }

    /// Recoverable-failure path. Always logs the failure at error level with
    /// the source locator and attempted cache path, then either surfaces
    /// "not found" or serves the unprocessed original per the policy.
    fn trouble(&self, source: &SourceRef, key: &str, reason: &str) -> Dispensed {
        let detail = format!(
            "source: {}, cache path: {}, reason: {}",
            source.locator,
            self.cache.absolute_path(key),
            reason
        );
        self.logger.error("unable to dispense derivative", &detail);

        match self.fallback {
            FallbackPolicy::Strict => Dispensed::Response(ImageResponse::not_found()),
            FallbackPolicy::Lenient => {
                self.logger
                    .warning("fallback engaged, serving original image", &detail);
                self.passthrough(source, &detail)
            }
        }
    }

    fn passthrough(&self, source: &SourceRef, detail: &str) -> Dispensed {
        match self.uploads.get(&source.locator) {
            Ok(body) => {
                let mut headers = vec![(FALLBACK_HEADER.to_string(), "true".to_string())];
                if let Some(media_type) = sniff_media_type(&body) {
                    headers.push(("Content-Type".to_string(), media_type.to_string()));
                }
                Dispensed::Response(ImageResponse {
                    status: 200,
                    body,
                    headers,
                })
            }
            Err(e) => {
                self.logger.error(
                    "fallback source unavailable",
                    &format!("{detail}, fallback error: {e}"),
                );
                Dispensed::Response(ImageResponse::not_found())
            }
        }
    }
}

fn resolved(
    width: Option<u32>,
    height: Option<u32>,
    context: &str,
) -> Result<(u32, u32), DispenseError> {
    match (width, height) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(DispenseError::UnresolvedDimensions {
            context: context.to_string(),
        }),
    }
}
