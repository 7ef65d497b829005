mod transition_flow_tests;
