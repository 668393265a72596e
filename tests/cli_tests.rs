#[test]
fn cli_tests() {
    let t = trycmd::TestCases::new();
    t.insert_var("[VERSION]", env!("CARGO_PKG_VERSION")).unwrap();
    t.case("tests/cmd/*.toml");
}
