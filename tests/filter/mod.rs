mod tests_expansion;
mod tests_predicates;
