mod test_disconnect_announces_leave;
