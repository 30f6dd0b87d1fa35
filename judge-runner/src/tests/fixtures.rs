/// Programs that copy their first line of stdin to stdout
pub mod echo {
    pub const CPP: &str = r#"
        #include <iostream>
        #include <string>
        int main() {
            std::string line;
            std::getline(std::cin, line);
            std::cout << line << std::endl;
            return 0;
        }
    "#;
    pub const JAVA: &str = r#"
        import java.io.BufferedReader;
        import java.io.InputStreamReader;

        public class Main {
            public static void main(String[] args) throws Exception {
                BufferedReader in = new BufferedReader(new InputStreamReader(System.in));
                String line = in.readLine();
                System.out.println(line == null ? "" : line);
            }
        }
    "#;
    pub const PYTHON: &str = r#"
import sys
print(sys.stdin.readline().rstrip("\n"))
"#;
}

/// Test code samples for specific scenarios
pub mod scenarios {
    pub const CPP_SUM: &str = r#"
        #include <iostream>
        int main() {
            long long a, b;
            std::cin >> a >> b;
            std::cout << a + b << "\n";
        }
    "#;
    pub const PYTHON_SUM: &str = r#"
a, b = map(int, input().split())
print(a + b)
"#;
    pub const PYTHON_STDIN_LENGTH: &str = r#"
import sys
print(len(sys.stdin.read()))
"#;
    pub const PYTHON_DIVIDE_BY_ZERO: &str = r#"
print("before")
print(1 / 0)
"#;
    pub const PYTHON_INFINITE_LOOP: &str = r#"
print("tick", flush=True)
while True:
    pass
"#;
    /// Writes its input to a fixed relative path, then reads it back after
    /// giving concurrent runs time to interfere.
    pub const PYTHON_SCRATCH_FILE: &str = r#"
import sys, time
data = sys.stdin.read().strip()
with open("scratch.txt", "w") as f:
    f.write(data)
time.sleep(0.3)
with open("scratch.txt") as f:
    print(f.read())
"#;
    pub const CPP_SYNTAX_ERROR: &str = r#"
        #include <iostream>
        int main() {
            std::cout << "unreachable" << std::endl
            return 0;
        }
    "#;
    pub const JAVA_TYPE_ERROR: &str = r#"
        public class Main {
            public static void main(String[] args) {
                int x = "not a number";
                System.out.println(x);
            }
        }
    "#;
    pub const JAVA_NESTED_CLASSES: &str = r#"
        public class Main {
            static class Point { int x, y; }
            interface Shape { int area(); }
            public static void main(String[] args) {
                Shape square = new Shape() { public int area() { return 4; } };
                Point p = new Point();
                System.out.println(square.area() + p.x);
            }
        }
    "#;
    pub const CPP_SEGFAULT: &str = r#"
        int main() {
            volatile int* p = nullptr;
            *p = 42;
            return 0;
        }
    "#;
}
