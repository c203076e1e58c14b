mod test_call_failures;
