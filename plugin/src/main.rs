fn main() {
    task_counter::run()
}
