//! Sketch skeleton written by `sketchc new`.

pub fn sketch_template(name: &str) -> String {
    format!(
        r#"// {} - Arduino Sketch
// Build: sketchc compile -b arduino:avr:uno .

void setup() {{
    Serial.begin(9600);
    pinMode(LED_BUILTIN, OUTPUT);
    Serial.println("Hello from {}!");
}}

void loop() {{
    digitalWrite(LED_BUILTIN, HIGH);
    delay(1000);
    digitalWrite(LED_BUILTIN, LOW);
    delay(1000);
}}
"#,
        name, name
    )
}
