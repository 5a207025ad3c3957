mod tests_exports;
