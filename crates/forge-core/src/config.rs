//! Carga de configuración del build desde variables de entorno.
//! Usa convención `MAPFORGE_*` con defaults razonables; el asset de entrada
//! es opcional aquí y su ausencia se valida al iniciar el build.

use std::env;

use dotenvy::dotenv;
use log::LevelFilter;
use once_cell::sync::Lazy;
use serde_json::json;

use crate::constants;
use crate::model::CtxValue;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Ubicación del asset de entrada (el mapa declarativo).
    pub map_path: Option<String>,
    /// Factor de escala de unidades del mapa a unidades del host.
    pub unit_scale: f64,
    /// Fuente del set de definiciones de entidad.
    pub entity_definitions_path: Option<String>,
    pub texture_search_path: String,
    pub texture_extension: String,
    pub material_extension: String,
    pub default_material: String,
    /// Archivos-contenedor adicionales donde buscar texturas.
    pub archive_paths: Vec<String>,
    /// Nombres de steps deshabilitados (flags de habilitación por stage).
    pub disabled_steps: Vec<String>,
    pub workers: usize,
    pub bucket_size: usize,
    pub verbose: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { map_path: None,
               unit_scale: 1.0,
               entity_definitions_path: None,
               texture_search_path: "textures".to_string(),
               texture_extension: "png".to_string(),
               material_extension: "tres".to_string(),
               default_material: "default".to_string(),
               archive_paths: Vec::new(),
               disabled_steps: Vec::new(),
               workers: constants::DEFAULT_WORKERS,
               bucket_size: constants::DEFAULT_BUCKET_SIZE,
               verbose: false }
    }
}

impl BuildConfig {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let defaults = Self::default();
        Self { map_path: env::var("MAPFORGE_MAP").ok().filter(|s| !s.is_empty()),
               unit_scale: parse_var("MAPFORGE_UNIT_SCALE", defaults.unit_scale),
               entity_definitions_path: env::var("MAPFORGE_ENTITY_DEFS").ok().filter(|s| !s.is_empty()),
               texture_search_path: env::var("MAPFORGE_TEXTURE_PATH").unwrap_or(defaults.texture_search_path),
               texture_extension: env::var("MAPFORGE_TEXTURE_EXT").unwrap_or(defaults.texture_extension),
               material_extension: env::var("MAPFORGE_MATERIAL_EXT").unwrap_or(defaults.material_extension),
               default_material: env::var("MAPFORGE_DEFAULT_MATERIAL").unwrap_or(defaults.default_material),
               archive_paths: parse_list("MAPFORGE_ARCHIVES"),
               disabled_steps: parse_list("MAPFORGE_DISABLED_STEPS"),
               workers: parse_var("MAPFORGE_WORKERS", defaults.workers),
               bucket_size: parse_var("MAPFORGE_BUCKET_SIZE", defaults.bucket_size),
               verbose: parse_var("MAPFORGE_VERBOSE", false) }
    }

    /// Un builder mínimo para tests y demos: sólo el asset de entrada.
    pub fn with_map(map_path: impl Into<String>) -> Self {
        Self { map_path: Some(map_path.into()),
               ..Self::default() }
    }

    pub fn step_enabled(&self, name: &str) -> bool {
        !self.disabled_steps.iter().any(|s| s == name)
    }

    /// Nivel de filtro de logging para los binarios según el toggle verbose.
    pub fn log_filter(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    /// Representación de la configuración como valor de contexto, sembrada
    /// bajo la clave `config` al iniciar el build.
    pub fn to_ctx_value(&self) -> CtxValue {
        CtxValue::nested([("map_path".to_string(), CtxValue::leaf(json!(self.map_path))),
                          ("unit_scale".to_string(), CtxValue::leaf(json!(self.unit_scale))),
                          ("texture_search_path".to_string(), CtxValue::leaf(json!(self.texture_search_path))),
                          ("texture_extension".to_string(), CtxValue::leaf(json!(self.texture_extension))),
                          ("material_extension".to_string(), CtxValue::leaf(json!(self.material_extension))),
                          ("default_material".to_string(), CtxValue::leaf(json!(self.default_material))),
                          ("archive_paths".to_string(), CtxValue::leaf(json!(self.archive_paths)))])
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_list(name: &str) -> Vec<String> {
    env::var(name).map(|v| {
                      v.split(',')
                       .map(|s| s.trim().to_string())
                       .filter(|s| !s.is_empty())
                       .collect()
                  })
                  .unwrap_or_default()
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_toggle_raises_the_log_filter() {
        let mut config = BuildConfig::default();
        assert_eq!(config.log_filter(), LevelFilter::Info);
        config.verbose = true;
        assert_eq!(config.log_filter(), LevelFilter::Debug);
    }

    #[test]
    fn with_map_sets_only_the_input_asset() {
        let config = BuildConfig::with_map("maps/a.map");
        assert_eq!(config.map_path.as_deref(), Some("maps/a.map"));
        assert!(config.step_enabled("parse_map"));
        assert!(!config.verbose);
    }
}
