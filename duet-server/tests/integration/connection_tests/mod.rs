mod test_abc123_signaling;
