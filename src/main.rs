fn main() {
    modsync_lib::run()
}
