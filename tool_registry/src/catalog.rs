//! Built-in OpenSearch tool catalogue.
//!
//! Every schema carries the `opensearch_cluster_name` connection selector;
//! the resolver strips it in single-cluster mode.

use serde_json::json;

use crate::{
    capability::{HttpMethod, MethodSet},
    descriptor::{HandlerRef, ToolDescriptor},
    registry::ToolRegistry,
    schema::{FieldSchema, InputSchema},
};

/// Connection-selector field handled internally by the server.
pub const CLUSTER_NAME_FIELD: &str = "opensearch_cluster_name";

/// Fields common to every tool that are never shown to the calling agent in
/// single-cluster mode.
pub const BASE_TOOL_FIELDS: &[&str] = &[CLUSTER_NAME_FIELD];

/// Baseline tools seeded into the built-in `core_tools` category. Entries
/// missing from a given registry are skipped.
pub const CORE_TOOLS: &[&str] = &[
    "ListIndexTool",
    "IndexMappingTool",
    "SearchIndexTool",
    "GetShardsTool",
    "ClusterHealthTool",
    "CountTool",
    "ExplainTool",
    "MsearchTool",
    "GenericOpenSearchApiTool",
];

pub const CORE_TOOLS_CATEGORY: &str = "core_tools";

fn base_args(title: &str) -> InputSchema {
    InputSchema::object().with_title(title).field(
        CLUSTER_NAME_FIELD,
        FieldSchema::string("The name of the OpenSearch cluster")
            .with_title("Opensearch Cluster Name")
            .with_default(json!("")),
    )
}

fn read_only(id: &str, description: &str, handler: &str, schema: InputSchema) -> ToolDescriptor {
    ToolDescriptor::new(id, description)
        .with_methods(MethodSet::read_only())
        .with_schema(schema)
        .with_handler(HandlerRef::new(handler))
}

/// The complete OpenSearch catalogue as a fresh registry.
pub fn default_catalog() -> ToolRegistry {
    let all_methods: MethodSet = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Patch,
    ]
    .into_iter()
    .collect();

    [
        read_only(
            "ListIndexTool",
            "Lists indices in the OpenSearch cluster. By default, returns a filtered list of index names only to minimize response size. Set include_detail=true to return full metadata from cat.indices (docs.count, store.size, etc.). If an index parameter is provided, returns detailed information for that specific index including mappings and settings.",
            "list_indices_tool",
            base_args("ListIndicesArgs")
                .field(
                    "index",
                    FieldSchema::string("The name of the index to get detailed information for. If provided, returns detailed information about this specific index instead of listing all indices.")
                        .with_default(json!("")),
                )
                .field(
                    "include_detail",
                    FieldSchema::boolean("Whether to include detailed information. When listing indices (no index specified), if False, returns only a pure list of index names. If True, returns full metadata. When a specific index is provided, detailed information (including mappings) will be returned.")
                        .with_default(json!(true)),
                ),
        )
        .with_min_version("1.0.0"),
        read_only(
            "IndexMappingTool",
            "Retrieves index mapping and setting information for an index in OpenSearch",
            "get_index_mapping_tool",
            base_args("GetIndexMappingArgs").required_field(
                "index",
                FieldSchema::string("The name of the index to get mapping information for"),
            ),
        ),
        read_only(
            "SearchIndexTool",
            "Searches an index using a query written in query domain-specific language (DSL) in OpenSearch",
            "search_index_tool",
            base_args("SearchIndexArgs")
                .required_field("index", FieldSchema::string("The name of the index to search in"))
                .required_field(
                    "query",
                    FieldSchema::any("The search query in OpenSearch query DSL format"),
                ),
        )
        .with_methods(MethodSet::read_only().with(HttpMethod::Post)),
        read_only(
            "GetShardsTool",
            "Gets information about shards in OpenSearch",
            "get_shards_tool",
            base_args("GetShardsArgs").required_field(
                "index",
                FieldSchema::string("The name of the index to get shard information for"),
            ),
        ),
        read_only(
            "GetClusterStateTool",
            "Gets the current state of the cluster including node information, index settings, and more. Can be filtered by specific metrics and indices.",
            "get_cluster_state_tool",
            base_args("GetClusterStateArgs")
                .field(
                    "metric",
                    FieldSchema::string("Limit the information returned to the specified metrics (e.g. nodes, metadata, routing_table)"),
                )
                .field(
                    "index",
                    FieldSchema::string("Limit the information returned to the specified indices"),
                ),
        )
        .with_min_version("1.0.0"),
        read_only(
            "GetSegmentsTool",
            "Gets information about Lucene segments in indices, including memory usage, document counts, and segment sizes. Can be filtered by specific indices.",
            "get_segments_tool",
            base_args("GetSegmentsArgs").field(
                "index",
                FieldSchema::string("Limit the information returned to the specified indices. If not provided, returns segments for all indices."),
            ),
        )
        .with_min_version("1.0.0"),
        read_only(
            "CatNodesTool",
            "Lists node-level information, including node roles and load metrics. Gets information about nodes metrics in the OpenSearch cluster, including system metrics pid, name, cluster_manager, ip, port, version, build, jdk, along with disk, heap, ram, and file_desc. Can be filtered to specific metrics.",
            "cat_nodes_tool",
            base_args("CatNodesArgs").field(
                "metrics",
                FieldSchema::string("A comma-separated list of metrics to display. If not provided, returns the default metrics."),
            ),
        )
        .with_min_version("1.0.0"),
        read_only(
            "GetIndexInfoTool",
            "Gets detailed information about an index including mappings, settings, and aliases. Supports wildcards in index names.",
            "get_index_info_tool",
            base_args("GetIndexInfoArgs").required_field(
                "index",
                FieldSchema::string("The name of the index to get detailed information for. Wildcards are supported."),
            ),
        )
        .with_min_version("1.0.0"),
        read_only(
            "GetIndexStatsTool",
            "Gets statistics about an index including document count, store size, indexing and search performance metrics. Can be filtered to specific metrics.",
            "get_index_stats_tool",
            base_args("GetIndexStatsArgs")
                .required_field(
                    "index",
                    FieldSchema::string("The name of the index to get statistics for. Wildcards are supported."),
                )
                .field(
                    "metric",
                    FieldSchema::string("Limit the information returned to the specified metrics (e.g. docs, store, indexing, search)"),
                ),
        )
        .with_min_version("1.0.0"),
        read_only(
            "GetQueryInsightsTool",
            "Gets query insights from the /_insights/top_queries endpoint, showing information about query patterns and performance.",
            "get_query_insights_tool",
            base_args("GetQueryInsightsArgs"),
        )
        .with_min_version("2.12.0"),
        read_only(
            "GetNodesHotThreadsTool",
            "Gets information about hot threads in the cluster nodes from the /_nodes/hot_threads endpoint.",
            "get_nodes_hot_threads_tool",
            base_args("GetNodesHotThreadsArgs"),
        )
        .with_min_version("1.0.0"),
        read_only(
            "GetAllocationTool",
            "Gets information about shard allocation across nodes in the cluster from the /_cat/allocation endpoint.",
            "get_allocation_tool",
            base_args("GetAllocationArgs"),
        )
        .with_min_version("1.0.0"),
        read_only(
            "GetLongRunningTasksTool",
            "Gets information about long-running tasks in the cluster, sorted by running time in descending order.",
            "get_long_running_tasks_tool",
            base_args("GetLongRunningTasksArgs").field(
                "limit",
                FieldSchema::integer("The maximum number of tasks to return").with_default(json!(10)),
            ),
        )
        .with_min_version("1.0.0"),
        read_only(
            "GetNodesTool",
            "Gets detailed information about nodes in the OpenSearch cluster, including static information like host system details, JVM info, processor type, node settings, thread pools, installed plugins, and more. Can be filtered by specific nodes and metrics.",
            "get_nodes_tool",
            base_args("GetNodesArgs")
                .field(
                    "node_id",
                    FieldSchema::string("A comma-separated list of node IDs or names to limit the returned information"),
                )
                .field(
                    "metric",
                    FieldSchema::string("A comma-separated list of metrics to limit the returned information (e.g. os, jvm, thread_pool, plugins)"),
                ),
        )
        .with_min_version("1.0.0"),
        read_only(
            "GenericOpenSearchApiTool",
            "A flexible tool for calling any OpenSearch API endpoint. Supports all HTTP methods with custom paths, query parameters, request bodies, and headers. Use this when you need to access OpenSearch APIs that don't have dedicated tools, or when you need more control over the request. Leverages your knowledge of OpenSearch API documentation to construct appropriate requests.",
            "generic_opensearch_api_tool",
            base_args("GenericOpenSearchApiArgs")
                .required_field(
                    "path",
                    FieldSchema::string("The API endpoint path (e.g., \"/_search\", \"/_cat/indices\", \"/my_index/_doc/1\"). Should start with \"/\"."),
                )
                .field(
                    "method",
                    FieldSchema::string("HTTP method to use (GET, POST, PUT, DELETE, HEAD, PATCH)")
                        .with_default(json!("GET")),
                )
                .field(
                    "query_params",
                    FieldSchema::any("Query parameters to include in the request URL as key-value pairs")
                        .with_default(json!(null)),
                )
                .field(
                    "body",
                    FieldSchema::any("Request body for GET/POST/PUT requests. Can be a JSON object, string, or None")
                        .with_default(json!(null)),
                )
                .field(
                    "headers",
                    FieldSchema::any("Additional HTTP headers to include in the request")
                        .with_default(json!(null)),
                ),
        )
        .with_min_version("1.0.0")
        .with_methods(all_methods),
    ]
    .into_iter()
    .collect()
}
