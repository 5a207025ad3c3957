mod tests_object_graph;
