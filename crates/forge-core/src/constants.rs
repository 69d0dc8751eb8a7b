//! Claves de contexto reservadas y valores por defecto del motor.

/// Clave reservada que representa el pool de workers del scheduler.
/// Ningún step puede declararla como input requerido; hacerlo se rechaza
/// al expandir el stage con `InvalidStepDeclaration`.
pub const SCHEDULER_KEY: &str = "thread_pool";

/// Clave estructural: los pares bajo esta clave no se fusionan como valores
/// planos sino que se ensamblan en el árbol de nodos de salida.
pub const TREE_KEY: &str = "node_tree";

/// Secuencia de registros de entidad sobre la que itera el fan-out PerEntity.
pub const ENTITIES_KEY: &str = "entities";

/// Tabla de brushes indexada por entidad (array de arrays) usada por PerBrush.
/// Debe ser residente en el contexto antes de que corra el stage.
pub const BRUSH_TABLE_KEY: &str = "entity_brushes";

/// Claves privadas inyectadas en el slice de cada job según su fan-out.
pub const ENTITY_INDEX_KEY: &str = "entity_index";
pub const ENTITY_KEY: &str = "entity";
pub const BRUSH_INDEX_KEY: &str = "brush_index";
pub const BRUSH_KEY: &str = "brush";

/// Clave bajo la que se siembra la configuración estática al inicio del build.
pub const CONFIG_KEY: &str = "config";

/// Lookup de definiciones de entidad cargado durante Initializing.
pub const ENTITY_DEFS_KEY: &str = "entity_definitions";

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_BUCKET_SIZE: usize = 16;
