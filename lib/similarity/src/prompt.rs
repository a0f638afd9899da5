use vialert_core::AccidentRecord;

/// Returned instead of an advisory when nothing similar is on record.
pub const NO_NEARBY_ACCIDENTS: &str =
    "No se encontraron registros de accidentes cercanos a esa zona. ¡Buen viaje!";

/// One summary line per neighbour, most similar first.
pub fn summarize(neighbours: &[AccidentRecord]) -> String {
    neighbours
        .iter()
        .map(AccidentRecord::summary_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for the traffic-safety advisor persona.
pub fn alert_prompt(address: &str, summary: &str) -> String {
    format!(
        r#"Eres un asistente experto en seguridad vial en Bogotá.
Analiza las zonas con más accidentes reportados y da recomendaciones útiles.

Las zonas donde han ocurrido más accidentes similares a "{address}" son:
{summary}

Con base en esto:
1. Menciona qué zonas o intersecciones debe evitar el conductor.
2. Sugiere rutas o vías alternativas más seguras para desplazarse.
3. Evita consejos genéricos; sé concreto con los nombres de las vías.
4. Redacta el mensaje como si fuera una alerta de tráfico real.
"#
    )
}
