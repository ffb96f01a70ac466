use envconfig::Envconfig;

/// Hash ring sizing.
///
/// `virtual_nodes_per_shard` is multiplied by each shard's weight to get
/// that shard's ring entry count. 100-500 is the recommended range; higher
/// values smooth the distribution at the cost of ring size.
#[derive(Envconfig, Clone, Debug)]
pub struct HashRouterConfig {
    #[envconfig(from = "SHARDWAY_VIRTUAL_NODES", default = "150")]
    pub virtual_nodes_per_shard: u32,
}

impl Default for HashRouterConfig {
    fn default() -> Self {
        Self {
            virtual_nodes_per_shard: 150,
        }
    }
}

impl HashRouterConfig {
    pub fn with_virtual_nodes(mut self, count: u32) -> Self {
        self.virtual_nodes_per_shard = count;
        self
    }
}
