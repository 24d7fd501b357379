use std::path::PathBuf;

use dreammesh_pipeline::PipelineConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8081`).
    pub port: u16,
    /// Compute device selector passed to the pipeline backend.
    pub device: String,
    /// Shape model identifier or path.
    pub model_path: String,
    /// Variant subfolder within the shape model.
    pub subfolder: String,
    /// Texture model identifier or path.
    pub tex_model_path: String,
    /// Whether text-to-3D submissions are enabled.
    pub enable_t23d: bool,
    /// Inference-acceleration mode for the shape pipeline.
    pub enable_flashvdm: bool,
    /// Reduced-memory mode for the texture pipeline.
    pub low_vram_mode: bool,
    /// Directory generated artifacts are written to.
    pub save_dir: PathBuf,
    /// Directory for log files.
    pub log_dir: PathBuf,
    /// Directory holding the HTML templates (index page).
    pub template_dir: PathBuf,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    /// Allowed CORS origins; `*` means fully permissive.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Retention cap on files in `save_dir` (default: `100`).
    pub max_output_files: usize,
    /// How many jobs may execute pipeline stages at once (default: `1`).
    pub pipeline_concurrency: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                           |
    /// |------------------------|-----------------------------------|
    /// | `HOST`                 | `0.0.0.0`                         |
    /// | `PORT`                 | `8081`                            |
    /// | `DEVICE`               | `cuda`                            |
    /// | `MODEL_PATH`           | `tencent/Hunyuan3D-2mini`         |
    /// | `SUBFOLDER`            | `hunyuan3d-dit-v2-mini-turbo`     |
    /// | `TEX_MODEL_PATH`       | `tencent/Hunyuan3D-2`             |
    /// | `ENABLE_T23D`          | `true`                            |
    /// | `ENABLE_FLASHVDM`      | `false`                           |
    /// | `LOW_VRAM_MODE`        | `false`                           |
    /// | `SAVE_DIR`             | `outputs`                         |
    /// | `LOG_DIR`              | `logs`                            |
    /// | `TEMPLATE_DIR`         | `templates`                       |
    /// | `STATIC_DIR`           | `static`                          |
    /// | `CORS_ORIGINS`         | `*`                               |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                              |
    /// | `MAX_OUTPUT_FILES`     | `100`                             |
    /// | `PIPELINE_CONCURRENCY` | `1`                               |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8081".into())
            .parse()
            .expect("PORT must be a valid u16");

        let device = std::env::var("DEVICE").unwrap_or_else(|_| "cuda".into());

        let model_path =
            std::env::var("MODEL_PATH").unwrap_or_else(|_| "tencent/Hunyuan3D-2mini".into());
        let subfolder =
            std::env::var("SUBFOLDER").unwrap_or_else(|_| "hunyuan3d-dit-v2-mini-turbo".into());
        let tex_model_path =
            std::env::var("TEX_MODEL_PATH").unwrap_or_else(|_| "tencent/Hunyuan3D-2".into());

        let enable_t23d = env_flag("ENABLE_T23D", true);
        let enable_flashvdm = env_flag("ENABLE_FLASHVDM", false);
        let low_vram_mode = env_flag("LOW_VRAM_MODE", false);

        let save_dir = env_path("SAVE_DIR", "outputs");
        let log_dir = env_path("LOG_DIR", "logs");
        let template_dir = env_path("TEMPLATE_DIR", "templates");
        let static_dir = env_path("STATIC_DIR", "static");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_output_files: usize = std::env::var("MAX_OUTPUT_FILES")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("MAX_OUTPUT_FILES must be a valid usize");

        let pipeline_concurrency: usize = std::env::var("PIPELINE_CONCURRENCY")
            .unwrap_or_else(|_| "1".into())
            .parse()
            .expect("PIPELINE_CONCURRENCY must be a valid usize");
        assert!(
            pipeline_concurrency > 0,
            "PIPELINE_CONCURRENCY must be at least 1"
        );

        Self {
            host,
            port,
            device,
            model_path,
            subfolder,
            tex_model_path,
            enable_t23d,
            enable_flashvdm,
            low_vram_mode,
            save_dir,
            log_dir,
            template_dir,
            static_dir,
            cors_origins,
            request_timeout_secs,
            max_output_files,
            pipeline_concurrency,
        }
    }

    /// Create the configured filesystem locations.
    ///
    /// Called once at startup; misconfiguration fails fast.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        for dir in [
            &self.save_dir,
            &self.log_dir,
            &self.template_dir,
            &self.static_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// The slice of configuration the pipeline loader needs.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            device: self.device.clone(),
            model_path: self.model_path.clone(),
            subfolder: self.subfolder.clone(),
            tex_model_path: self.tex_model_path.clone(),
            enable_t23d: self.enable_t23d,
            enable_flashvdm: self.enable_flashvdm,
            low_vram_mode: self.low_vram_mode,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => v.eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}

fn env_path(name: &str, default: &str) -> PathBuf {
    std::env::var(name)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}
