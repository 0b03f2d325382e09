use petgraph::stable_graph::NodeIndex;

/// Node id to petgraph `NodeIndex`.
pub type NodeIndexMap = std::collections::HashMap<String, NodeIndex>;
