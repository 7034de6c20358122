mod test_common_validation;
mod test_concurrent_token_bucket;
