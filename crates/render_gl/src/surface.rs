//! Display, config and context negotiation
//!
//! [`GlSetup`] walks the display's configs looking for one that can render
//! GL ES 3 into both a window and a pbuffer with the exact channel sizes
//! requested, creates the best context version it can get and makes a tiny
//! pbuffer current so GL calls are valid before the real window surface
//! exists.

use crate::error::SurfaceError;
use std::fmt::Debug;

pub const EGL_OPENGL_ES3_BIT: i32 = 0x0040;
pub const EGL_PBUFFER_BIT: i32 = 0x0001;
pub const EGL_WINDOW_BIT: i32 = 0x0004;

const PBUFFER_SIZE: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAttrib {
    Red,
    Green,
    Blue,
    Alpha,
    Depth,
    Stencil,
    Samples,
    SurfaceType,
    RenderableType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayString {
    Vendor,
    ClientApis,
    Version,
    Extensions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Platform seam for EGL-like display APIs
pub trait DisplayBackend {
    type Config: Copy + Debug;
    type Context: Debug;
    type Surface: Debug;

    /// Returns the display's (major, minor) version
    fn initialize(&mut self) -> Option<(i32, i32)>;
    fn query_string(&self, name: DisplayString) -> String;
    fn configs(&self) -> Vec<Self::Config>;
    fn config_attrib(&self, config: Self::Config, attrib: ConfigAttrib) -> i32;
    /// `priority` is `None` when the driver default should be used
    fn create_context(
        &mut self,
        config: Self::Config,
        version: i32,
        priority: Option<ContextPriority>,
    ) -> Option<Self::Context>;
    fn context_priority(&self, context: &Self::Context) -> ContextPriority;
    fn create_pbuffer_surface(&mut self, config: Self::Config, width: i32, height: i32) -> Option<Self::Surface>;
    fn make_current(&mut self, surface: Option<&Self::Surface>, context: Option<&Self::Context>) -> bool;
    fn destroy_context(&mut self, context: Self::Context);
    fn destroy_surface(&mut self, surface: Self::Surface);
    fn terminate(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceRequest {
    pub gles_version: i32,
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub depth: i32,
    pub samples: i32,
    pub priority: ContextPriority,
}

impl Default for SurfaceRequest {
    fn default() -> Self {
        Self {
            gles_version: 3,
            red: 8,
            green: 8,
            blue: 8,
            depth: 0,
            samples: 0,
            priority: ContextPriority::Medium,
        }
    }
}

/// A current GL context backed by a pbuffer
pub struct GlSetup<B: DisplayBackend> {
    backend: B,
    config: B::Config,
    context: Option<B::Context>,
    surface: Option<B::Surface>,
    gles_version: i32,
    priority: ContextPriority,
}

/// First config that is ES3 renderable, supports the needed surface types and
/// matches every requested channel size exactly
pub fn choose_color_config<B: DisplayBackend>(
    backend: &B,
    request: &SurfaceRequest,
    pbuffer: bool,
) -> Option<B::Config> {
    let configs = backend.configs();
    tracing::info!("display reports {} configs", configs.len());

    // alpha is needed for the multi-pass compositor
    let wanted = [
        (ConfigAttrib::Alpha, if request.red == 8 { 8 } else { 0 }),
        (ConfigAttrib::Blue, request.blue),
        (ConfigAttrib::Green, request.green),
        (ConfigAttrib::Red, request.red),
        (ConfigAttrib::Depth, request.depth),
        (ConfigAttrib::Samples, request.samples),
    ];
    let surfaces = EGL_WINDOW_BIT | if pbuffer { EGL_PBUFFER_BIT } else { 0 };

    configs.into_iter().find(|&config| {
        let renderable = backend.config_attrib(config, ConfigAttrib::RenderableType);
        if renderable & EGL_OPENGL_ES3_BIT != EGL_OPENGL_ES3_BIT {
            return false;
        }
        let surface_type = backend.config_attrib(config, ConfigAttrib::SurfaceType);
        if surface_type & surfaces != surfaces {
            return false;
        }
        let matched = wanted
            .iter()
            .all(|&(attrib, value)| backend.config_attrib(config, attrib) == value);
        if matched {
            tracing::info!("found a renderable config: {config:?}");
        }
        matched
    })
}

fn log_words(label: &str, words: &str) {
    tracing::info!("{label}:");
    for word in words.split_whitespace() {
        tracing::info!("  {word}");
    }
}

impl<B: DisplayBackend> GlSetup<B> {
    pub fn new(mut backend: B, request: SurfaceRequest) -> Result<Self, SurfaceError> {
        tracing::info!(?request, "GL setup");

        let Some((major, minor)) = backend.initialize() else {
            return Err(SurfaceError::DisplayInit);
        };
        tracing::info!("display initialized, version {major}.{minor}");
        tracing::info!("vendor: {}", backend.query_string(DisplayString::Vendor));
        tracing::info!("client APIs: {}", backend.query_string(DisplayString::ClientApis));
        tracing::info!("version: {}", backend.query_string(DisplayString::Version));
        log_words("extensions", &backend.query_string(DisplayString::Extensions));

        let Some(config) = choose_color_config(&backend, &request, true) else {
            tracing::error!("no acceptable display configs");
            backend.terminate();
            return Err(SurfaceError::NoMatchingConfig {
                red: request.red,
                green: request.green,
                blue: request.blue,
                depth: request.depth,
                samples: request.samples,
            });
        };

        let priority = match request.priority {
            ContextPriority::Medium => None,
            other => Some(other),
        };
        let mut created = None;
        for version in (2..=request.gles_version).rev() {
            tracing::info!("trying for a GL ES {version} context");
            if let Some(context) = backend.create_context(config, version, priority) {
                tracing::info!("succeeded");
                created = Some((context, version));
                break;
            }
        }
        let Some((context, gles_version)) = created else {
            tracing::error!("context creation failed");
            backend.terminate();
            return Err(SurfaceError::ContextCreation {
                requested: request.gles_version,
            });
        };

        let actual_priority = backend.context_priority(&context);
        if actual_priority != request.priority {
            tracing::warn!(requested = ?request.priority, actual = ?actual_priority, "context priority not granted");
        } else {
            tracing::info!(priority = ?actual_priority, "context priority");
        }

        let Some(surface) = backend.create_pbuffer_surface(config, PBUFFER_SIZE, PBUFFER_SIZE) else {
            tracing::error!("pbuffer surface creation failed");
            backend.destroy_context(context);
            backend.terminate();
            return Err(SurfaceError::PbufferCreation);
        };

        if !backend.make_current(Some(&surface), Some(&context)) {
            tracing::error!("make current failed");
            backend.destroy_surface(surface);
            backend.destroy_context(context);
            backend.terminate();
            return Err(SurfaceError::MakeCurrent);
        }

        Ok(Self {
            backend,
            config,
            context: Some(context),
            surface: Some(surface),
            gles_version,
            priority: actual_priority,
        })
    }

    pub fn gles_version(&self) -> i32 {
        self.gles_version
    }

    pub fn priority(&self) -> ContextPriority {
        self.priority
    }

    pub fn config(&self) -> B::Config {
        self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_live(&self) -> bool {
        self.context.is_some()
    }

    /// Release the context and surface and terminate the display
    pub fn shutdown(&mut self) {
        if self.context.is_none() && self.surface.is_none() {
            return;
        }
        if !self.backend.make_current(None, None) {
            tracing::warn!("failed to release the current context");
        }
        if let Some(context) = self.context.take() {
            self.backend.destroy_context(context);
        }
        if let Some(surface) = self.surface.take() {
            self.backend.destroy_surface(surface);
        }
        self.backend.terminate();
    }
}

impl<B: DisplayBackend> Drop for GlSetup<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
