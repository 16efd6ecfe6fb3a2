pub mod mock_bucket;
