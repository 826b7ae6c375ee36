//! Deterministic prompt construction for the batch extraction call.
//!
//! The prompt embeds the controlled vocabulary as structured data plus a
//! worked example, and states the hard contract the rest of the pipeline
//! depends on: a JSON array of exactly N objects, order-aligned with the
//! input, where an empty `eventos_detectados` list is the explicit answer
//! for "nothing relevant", never an omission.

use std::fmt::Write as _;

use serde_json::{Map, Value as JsonValue};

use crate::vocabulary::{keywords_for, Action, Component, SYNONYMS};

/// Render the full instruction text for one batch of descriptions.
///
/// Pure and deterministic: the same input list always yields the same
/// prompt byte-for-byte.
pub fn build_prompt(descriptions: &[String]) -> String {
    let n = descriptions.len();
    let components = Component::canonical()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ");
    let synonym_json = synonym_table_json();

    let mut prompt = String::new();
    let _ = write!(
        prompt,
        "Eres un asistente experto en análisis de registros de servicio de flotas vehiculares. \
Dada la siguiente lista de {n} descripciones de servicio, analiza CADA descripción INDIVIDUALMENTE \
e identifica los componentes mencionados, la acción realizada sobre ellos, y CUALQUIER IDENTIFICADOR \
ÚNICO (IMEI, número de serie, MAC address como C2313007631, TDBLE_XXXX/XX:XX:XX:XX:XX:XX, o \
F7C74F3F64D2, Power Hub #868, PowerLite 111) asociado DIRECTAMENTE con ese componente específico \
en la descripción.\n\n"
    );

    let _ = write!(
        prompt,
        "Componentes a buscar y estandarizar a estos nombres: {components}.\n\
Usa el siguiente mapeo para estandarizar variantes:\n{synonym_json}\n\
Si un componente no está en la lista o no es relevante (ej. 'tornillo', 'limpieza general', 'cable', \
'tierra', 'corriente', 'tarjeta sd', 'memoria', 'sim', 'fusible', 'portafusible', 'sikaflex', 'pija'), \
ignóralo. Ignora también nombres de marcas (Teltonika, Suntech, Queclink, GTRACK, Ruptela, Concox, \
Topflytech, Sinotrack) a menos que claramente se refieran al componente GPS principal. Si la marca \
incluye un modelo (ej. \"Teltonika FMB920\"), el modelo (FMB920) puede ser parte del accesorio_id si \
es un GPS.\n\
Un \"relevador\" solo es relevante si se menciona en un contexto de instalación/desinstalación/cambio \
explícito DEL RELEVADOR. No lo infieras para \"paro de motor\".\n\n"
    );

    prompt.push_str("Acciones y sus palabras clave asociadas:\n");
    push_action_line(
        &mut prompt,
        Action::Installation,
        "",
    );
    push_action_line(&mut prompt, Action::Uninstallation, "");
    push_action_line(
        &mut prompt,
        Action::Replacement,
        " (Implica que el componente SIGUE presente).",
    );
    push_action_line(
        &mut prompt,
        Action::Inspection,
        " (NO cambia el estado de instalación).",
    );
    push_action_line(
        &mut prompt,
        Action::TankMeasurement,
        " (NO cambia el estado de instalación; es específica para niveles de fluidos, usualmente \
asociada con 'Sensor Combustible').",
    );
    prompt.push('\n');

    prompt.push_str(
        "Interpretaciones especiales:\n\
- \"SE QUITO [ID_NUMERICO_LARGO] Teltonika FMB920\": Esto es `Desinstalacion` del `GPS`, y el \
[ID_NUMERICO_LARGO] es el `accesorio_id` para ESE GPS.\n\
- \"SE PUSO EASY CAN C2313007631\": `Instalacion` de `CAN Bus`, y `accesorio_id` es \"C2313007631\".\n\
- \"SE INSTALO 2 SENSORES DE TEMPERATURA CABLEADOS\": `Instalacion` de `Sensor Temperatura`.\n\
- \"2 cambios de barras de combustible /C6BF2AEEEE4A /C2823E7A4184\": `Reemplazo` de \
`Sensor Combustible`. `accesorio_id` debería ser \"C6BF2AEEEE4A, C2823E7A4184\".\n\
- \"SE PUSO POWER HUB #868\": `Instalacion` de `Power Hub`, `accesorio_id` es \"868\".\n\
- \"Se realizó aforo de tanque para sensor de combustible\": `Medicion Tanque` para \
`Sensor Combustible`. Si el ID del sensor está, inclúyelo.\n\
- \"Medición de tanque\": Si no se menciona explícitamente un \"Sensor Combustible\" pero el contexto \
es claro, asocia la acción \"Medicion Tanque\" al componente \"Sensor Combustible\".\n\
- Si un componente tiene múltiples IDs, lista los IDs en `accesorio_id` como una cadena separada por \
comas. Si no hay ID específico, `accesorio_id` debe ser nulo.\n\
- Si la descripción es solo un ID (ej. \"C2313007597\"), asume `Instalacion` de `CAN Bus` con ese ID.\n\
- \"SOLO RASTREO\": `Revision/Neutra` del `GPS`. \"reinstalacion de equipo solo rastreo\": \
`Instalacion` de `GPS`.\n\
- \"SE HIZO UN RESET\": `Revision/Neutra` del `GPS`.\n\
- \"se le retira corte de motor\": `Desinstalacion` de `Paro de Motor`.\n\
- \"se retira equipo\": `Desinstalacion` de `GPS`.\n\
- \"Texto completamente irrelevante o confuso\": DEBE resultar en { \"eventos_detectados\": [] }.\n\n",
    );

    let _ = write!(
        prompt,
        "Para CADA una de las {n} descripciones de entrada, devuelve un objeto JSON con la clave \
\"eventos_detectados\", que es una lista de objetos. Cada objeto debe tener \"componente\", \
\"accion\", y opcionalmente \"accesorio_id\".\n\n\
**REGLA CRÍTICA E INQUEBRANTABLE:** La respuesta DEBE SER una lista JSON que contenga EXACTAMENTE \
{n} elementos.\n\
Cada elemento de la lista JSON DEBE corresponder a una descripción de entrada, en el MISMO ORDEN.\n\
* Si por CUALQUIER MOTIVO (incluyendo incapacidad de análisis, error interno del modelo, o falta de \
componentes/acciones relevantes en una descripción) no puedes procesar una descripción específica o \
no encuentras nada relevante, DEBES OBLIGATORIAMENTE incluir {{ \"eventos_detectados\": [] }} en la \
posición correspondiente a esa descripción en la lista de salida.\n\
* NO OMITAS NINGÚN ELEMENTO DE LA LISTA. La longitud de la lista de salida DEBE SER SIEMPRE {n}. \
NO PUEDE SER MENOR.\n\n\
No incluyas explicaciones adicionales. Solo la lista JSON pura y válida con exactamente {n} \
elementos.\n\n"
    );

    prompt.push_str(WORKED_EXAMPLE);

    let _ = write!(
        prompt,
        "\nAhora procesa la siguiente lista de {n} descripciones:\n"
    );
    for description in descriptions {
        let _ = writeln!(prompt, "- \"{description}\"");
    }
    let _ = write!(
        prompt,
        "\nDevuelve únicamente la lista JSON con EXACTAMENTE {n} elementos.\n"
    );

    prompt
}

fn push_action_line(prompt: &mut String, action: Action, suffix: &str) {
    let keywords = keywords_for(action)
        .iter()
        .map(|kw| format!("'{kw}'"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(prompt, "- {}: {}.{}", action.label(), keywords, suffix);
}

/// Synonym table rendered as a JSON object; `serde_json`'s map keeps keys
/// sorted, so the rendering is stable across runs.
fn synonym_table_json() -> String {
    let mut table = Map::new();
    for (synonym, component) in SYNONYMS {
        table.insert(
            (*synonym).to_string(),
            JsonValue::String(component.label().to_string()),
        );
    }
    serde_json::to_string_pretty(&JsonValue::Object(table))
        .unwrap_or_else(|_| "{}".to_string())
}

const WORKED_EXAMPLE: &str = r#"Ejemplos de Entrada (Lista de 8 descripciones):
- "SE Retiro de paro de motor"
- "INST EASY CAN C2313007631 TDBLE_308529/DD:2B:C1:75:2F:FA TDBLE_308552/EE:9B:27:5B:78:38 TDBLE_308545/E0:AE:76:02:35:83"
- "SE QUITO 359632107908086 Teltonika FMB920"
- "SE PUSO POWER HUB 868"
- "2 cambios de barras de combustible /C6BF2AEEEE4A /C2823E7A4184"
- "SE HIZO UN RESET"
- "Medición de tanque para unidad con sensor de combustible TDBLE_123456"
- "Esta es una descripción sin componentes relevantes."

Ejemplo de Salida Esperada (Lista JSON con 8 elementos):
[
  { "eventos_detectados": [{ "componente": "Paro de Motor", "accion": "Desinstalacion" }] },
  { "eventos_detectados": [
      { "componente": "CAN Bus", "accion": "Instalacion", "accesorio_id": "C2313007631" },
      { "componente": "Sensor Combustible", "accion": "Instalacion", "accesorio_id": "TDBLE_308529/DD:2B:C1:75:2F:FA, TDBLE_308552/EE:9B:27:5B:78:38, TDBLE_308545/E0:AE:76:02:35:83" }
  ]},
  { "eventos_detectados": [{ "componente": "GPS", "accion": "Desinstalacion", "accesorio_id": "359632107908086" }] },
  { "eventos_detectados": [{ "componente": "Power Hub", "accion": "Instalacion", "accesorio_id": "868" }] },
  { "eventos_detectados": [{ "componente": "Sensor Combustible", "accion": "Reemplazo", "accesorio_id": "C6BF2AEEEE4A, C2823E7A4184" }] },
  { "eventos_detectados": [{ "componente": "GPS", "accion": "Revision/Neutra" }] },
  { "eventos_detectados": [{ "componente": "Sensor Combustible", "accion": "Medicion Tanque", "accesorio_id": "TDBLE_123456" }] },
  { "eventos_detectados": [] }
]
"#;
