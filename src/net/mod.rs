pub mod fetch;
pub mod pdf_cache;
pub mod probe;

#[cfg(test)]
pub(crate) mod test_server;
