#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geom;

use std::fmt;

use geom::{
    AnyCurve, CurveError, MarkerOptions, MeshError, Point3, TessellationMetrics, TimingBucket,
    TubeError, TubeMesh, TubeOptions, TubeTessellation, build_line_mesh, build_point_mesh,
    tessellate_tube,
};
use wasm_bindgen::prelude::*;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            // no-op fallback when panic hook is disabled
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {
    // no-op fallback when debug logs are disabled
}

#[cfg(all(feature = "parallel", target_arch = "wasm32"))]
#[wasm_bindgen]
pub async fn initialize_parallel(worker_count: Option<u32>) -> Result<(), JsError> {
    let threads = worker_count
        .map(|count| count.max(1) as usize)
        .or_else(|| {
            std::thread::available_parallelism()
                .map(|value| value.get())
                .ok()
        })
        .unwrap_or(1);

    wasm_bindgen_rayon::init_thread_pool(threads)
        .await
        .map_err(|err| JsError::new(&format!("could not initialise rayon thread pool: {err}")))
}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no curve loaded")]
    NoCurve,
    #[error("curve has not been tessellated")]
    NotTessellated,
    #[error(transparent)]
    Curve(#[from] CurveError),
    #[error(transparent)]
    Tube(#[from] TubeError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Public entry point for consumers.
///
/// Holds one curve, its tube options and the buffers of the last
/// tessellation. Every rebuild discards the previous samples and buffers.
#[wasm_bindgen]
pub struct Engine {
    curve: Option<AnyCurve>,
    options: TubeOptions,
    markers: MarkerOptions,
    mesh: TubeMesh,
    debug_points: TubeMesh,
    debug_lines: TubeMesh,
    last_tessellation: Option<TubeTessellation>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Engine {
        Engine {
            curve: None,
            options: TubeOptions::default(),
            markers: MarkerOptions::default(),
            mesh: TubeMesh::new(),
            debug_points: TubeMesh::new(),
            debug_lines: TubeMesh::new(),
            last_tessellation: None,
        }
    }

    /// Loads a curve given as `{ type: "bezier" | "line" | "generic", ... }`.
    #[wasm_bindgen]
    pub fn load_curve(&mut self, curve: JsValue) -> Result<(), JsValue> {
        let curve: AnyCurve = serde_wasm_bindgen::from_value(curve).map_err(to_js_error)?;
        self.set_curve(curve);
        Ok(())
    }

    /// Replaces the tube options; omitted fields take their defaults.
    #[wasm_bindgen]
    pub fn set_options(&mut self, options: JsValue) -> Result<(), JsValue> {
        let options: TubeOptions = serde_wasm_bindgen::from_value(options).map_err(to_js_error)?;
        self.set_tube_options(options).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn set_markers(&mut self, markers: JsValue) -> Result<(), JsValue> {
        let markers: MarkerOptions = serde_wasm_bindgen::from_value(markers).map_err(to_js_error)?;
        self.set_marker_options(markers);
        Ok(())
    }

    /// Moves one control point and re-tessellates.
    #[wasm_bindgen]
    pub fn move_control_point(&mut self, index: usize, x: f64, y: f64, z: f64) -> Result<(), JsValue> {
        self.update_control_point(index, Point3::new(x, y, z))
            .map_err(to_js_error)?;
        self.rebuild().map(|_| ()).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn tessellate(&mut self) -> Result<(), JsValue> {
        self.rebuild().map(|_| ()).map_err(to_js_error)
    }

    /// Committed tube buffers as flat arrays.
    #[wasm_bindgen]
    pub fn get_mesh(&self) -> Result<JsValue, JsValue> {
        self.require_tessellation().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&self.mesh.export()).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn get_sample_parameters(&self) -> Result<Vec<f64>, JsValue> {
        self.sample_parameters().ok_or_else(|| to_js_error(EngineError::NotTessellated))
    }

    #[wasm_bindgen]
    pub fn get_debug_points(&self) -> Result<JsValue, JsValue> {
        self.require_tessellation().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&self.debug_points.export()).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn get_debug_lines(&self) -> Result<JsValue, JsValue> {
        self.require_tessellation().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&self.debug_lines.export()).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn get_diagnostics(&self) -> Result<JsValue, JsValue> {
        let tessellation = self.require_tessellation().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&tessellation.diagnostics).map_err(to_js_error)
    }
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    // Building a JS string needs the JS host; native callers get the message
    // from the `EngineError` returned by the native methods.
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}

impl Engine {
    /// Replaces the curve and drops the previous tessellation.
    pub fn set_curve(&mut self, curve: AnyCurve) {
        self.curve = Some(curve);
        self.invalidate();
    }

    #[must_use]
    pub fn curve(&self) -> Option<&AnyCurve> {
        self.curve.as_ref()
    }

    /// Validates and stores tube options. Invalid options leave the previous ones in place.
    pub fn set_tube_options(&mut self, options: TubeOptions) -> Result<(), EngineError> {
        options.validate()?;
        self.options = options;
        self.invalidate();
        Ok(())
    }

    #[must_use]
    pub fn tube_options(&self) -> &TubeOptions {
        &self.options
    }

    pub fn set_marker_options(&mut self, markers: MarkerOptions) {
        self.markers = markers;
    }

    /// Moves one control point of the loaded curve. Call [`Engine::rebuild`] afterwards.
    pub fn update_control_point(&mut self, index: usize, position: Point3) -> Result<(), EngineError> {
        let curve = self.curve.as_mut().ok_or(EngineError::NoCurve)?;
        curve.move_control_point(index, position)?;
        self.invalidate();
        Ok(())
    }

    /// Re-tessellates from scratch: samples, frames, tube and marker buffers.
    ///
    /// On failure every buffer is left empty.
    pub fn rebuild(&mut self) -> Result<&TubeTessellation, EngineError> {
        self.invalidate();
        match self.rebuild_buffers() {
            Ok(tessellation) => {
                debug_log!("engine rebuilt: {}", tessellation.diagnostics.summary());
                Ok(self.last_tessellation.insert(tessellation))
            }
            Err(error) => {
                log::warn!("tessellation failed: {error}");
                self.mesh.clear();
                self.debug_points.clear();
                self.debug_lines.clear();
                Err(error)
            }
        }
    }

    #[must_use]
    pub fn mesh(&self) -> &TubeMesh {
        &self.mesh
    }

    #[must_use]
    pub fn debug_points(&self) -> &TubeMesh {
        &self.debug_points
    }

    #[must_use]
    pub fn debug_lines(&self) -> &TubeMesh {
        &self.debug_lines
    }

    /// Parameters of the last tessellation's adaptive samples.
    #[must_use]
    pub fn sample_parameters(&self) -> Option<Vec<f64>> {
        self.last_tessellation.as_ref().map(|t| t.samples.parameters())
    }

    #[must_use]
    pub fn last_tessellation(&self) -> Option<&TubeTessellation> {
        self.last_tessellation.as_ref()
    }

    fn require_tessellation(&self) -> Result<&TubeTessellation, EngineError> {
        self.last_tessellation.as_ref().ok_or(EngineError::NotTessellated)
    }

    fn invalidate(&mut self) {
        self.last_tessellation = None;
    }

    fn rebuild_buffers(&mut self) -> Result<TubeTessellation, EngineError> {
        let curve = self.curve.as_ref().ok_or(EngineError::NoCurve)?;
        let mut tessellation = tessellate_tube(curve, &self.options, &mut self.mesh)?;

        let mut metrics = TessellationMetrics::default();
        metrics.begin();
        metrics.time(TimingBucket::DebugMesh, || {
            build_point_mesh(curve, &tessellation.samples, &self.markers, &mut self.debug_points)?;
            build_line_mesh(curve, &tessellation.samples, &self.markers, &mut self.debug_lines)
        })?;
        if let (Some(report), Some(timing)) = (metrics.end(), tessellation.diagnostics.timing.as_mut()) {
            timing.debug_mesh_ns = report.debug_mesh_ns;
        }
        Ok(tessellation)
    }
}
