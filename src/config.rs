/// Runtime configuration for a graft engine.
#[derive(Debug, Clone)]
pub struct GraftConfig {
    /// Hard bound on nested-input recursion. Schemas may be cyclic, but any
    /// well-formed input tree is finite; the bound only guards against
    /// hand-crafted pathological trees.
    pub max_resolve_depth: usize,
    /// Name of the savepoint wrapping each top-level request.
    pub savepoint_name: String,
}

impl Default for GraftConfig {
    fn default() -> Self {
        Self {
            max_resolve_depth: 32,
            savepoint_name: "graft_nested_mutation".to_string(),
        }
    }
}
