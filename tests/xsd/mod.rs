mod tests_enrich;
